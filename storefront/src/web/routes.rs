// storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  admin_handlers, checkout_handlers, dev_handlers, order_handlers, product_handlers, webhook_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Mounts every route under `/api/v1`. `with_dev_routes` adds the mock
/// payment completion endpoint.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig, with_dev_routes: bool) {
  let mut api = web::scope("/api/v1")
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/products")
        .route("", web::get().to(product_handlers::list_products_handler))
        .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
    )
    .service(
      web::scope("/checkout")
        .route("", web::post().to(checkout_handlers::start_checkout_handler))
        .route(
          "/sessions/{session_id}/order",
          web::get().to(checkout_handlers::order_for_session_handler),
        ),
    )
    .service(
      web::scope("/orders")
        .route("", web::get().to(order_handlers::list_my_orders_handler))
        .route("", web::post().to(order_handlers::create_order_from_session_handler))
        .route("/{order_id}", web::get().to(order_handlers::get_order_handler)),
    )
    .service(web::scope("/webhooks").route("/payments", web::post().to(webhook_handlers::payment_webhook_handler)))
    .service(
      web::scope("/admin")
        .route("/orders", web::get().to(admin_handlers::list_orders_handler))
        .route(
          "/orders/{order_id}/status",
          web::patch().to(admin_handlers::update_order_status_handler),
        )
        .route("/products", web::post().to(admin_handlers::create_product_handler))
        .route("/products/{product_id}", web::patch().to(admin_handlers::update_product_handler))
        .route("/emails", web::get().to(admin_handlers::list_email_logs_handler)),
    );

  if with_dev_routes {
    // GET so the redirect URL handed to buyers works from a browser.
    api = api.service(
      web::resource("/dev/payments/{session_id}/complete")
        .route(web::get().to(dev_handlers::complete_mock_payment_handler))
        .route(web::post().to(dev_handlers::complete_mock_payment_handler)),
    );
  }
  cfg.service(api);
}
