use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use env_logger::Env;
use eva_ftp_agent::api;
use eva_ftp_agent::appstate::appstate::AppState;
use eva_ftp_agent::config::{self, AgentConfig, ConfigBundle};
use eva_ftp_agent::error::ConfigError;
use eva_ftp_agent::ftp::{FtpConnector, FtpPool};
use std::sync::Arc;

fn load() -> Result<(AgentConfig, config::ConnectionFactoryDescriptor), ConfigError> {
    let agent = AgentConfig::from_env()?;
    let bundle = match &agent.bundle_file {
        Some(path) => {
            log::info!("loading ENA FTP configuration from {}", path.display());
            ConfigBundle::from_json_file(path)?
        }
        None => ConfigBundle::from_env(),
    };
    let descriptor = config::build(&bundle)?;
    Ok((agent, descriptor))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let (agent, descriptor) = match load() {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let descriptor = Arc::new(descriptor);
    let connector = FtpConnector::new(descriptor.clone(), agent.connect_timeout);
    let pool = FtpPool::new(connector, agent.pool_size);

    let state = web::Data::new(AppState {
        descriptor,
        pool,
        ftp_dir: agent.ftp_dir.clone(),
    });

    log::info!("listening on {}", agent.bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
            .wrap(Logger::default())
            .default_service(web::route().to(|req: actix_web::HttpRequest| async move {
                log::info!("404 Not Found: {}", req.path());
                HttpResponse::NotFound().body("Not Found")
            }))
    })
    .bind(agent.bind_addr)?
    .run()
    .await
}
