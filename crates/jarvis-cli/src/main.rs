mod cli;

use jarvis_client::ClientError;

fn main() {
    if let Err(e) = cli::run() {
        if e
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_session_expired)
        {
            eprintln!("{}", cli::LOGIN_HINT);
            std::process::exit(2);
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
