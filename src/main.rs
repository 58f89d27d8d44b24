#[tokio::main]
async fn main() {
    if let Err(e) = vip_fiesta::frameworks::server::run_with_config().await {
        tracing::error!(error = %e, "server exited");
        std::process::exit(1);
    }
}
