use actix_web::web;
pub mod ftp;

pub mod domain;

pub mod deposit;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("")
        .route("/ftp/connection", web::get().to(ftp::connection::get_connection))
        .route("/ftp/check", web::get().to(ftp::connection::check_connection))
        .route("/deposit/{ftp_box}", web::get().to(deposit::report::list_box))
        .route("/deposit/{ftp_box}/{username}", web::get().to(deposit::report::user_report)));
}
