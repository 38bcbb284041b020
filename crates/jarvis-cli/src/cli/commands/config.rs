use jarvis_client::config::paths;

pub fn path() {
    println!("{}", paths::config_path().display());
}
