use crate::{
    api::{attendance, correction, report, work_rule},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    // Clock punches get a tighter budget than the read endpoints since a
    // stuck badge terminal tends to retry in a loop.
    let clock_limiter = Arc::new(build_limiter(config.rate_clock_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/clock-in
                    .service(
                        web::resource("/clock-in")
                            .wrap(clock_limiter.clone())
                            .route(web::post().to(attendance::clock_in)),
                    )
                    // /attendance/clock-out
                    .service(
                        web::resource("/clock-out")
                            .wrap(clock_limiter.clone())
                            .route(web::post().to(attendance::clock_out)),
                    )
                    // /attendance/history?month=YYYY-MM
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    // /attendance/daily?date=YYYY-MM-DD
                    .service(web::resource("/daily").route(web::get().to(attendance::daily_overview)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(attendance::update_attendance)),
                    ),
            )
            .service(
                web::scope("/corrections")
                    // /corrections/attendance/{id}
                    .service(
                        web::resource("/attendance/{id}")
                            .route(web::post().to(correction::submit_correction)),
                    )
                    // /corrections/pending
                    .service(
                        web::resource("/pending")
                            .route(web::get().to(correction::pending_corrections)),
                    )
                    // /corrections/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(correction::approve_correction)),
                    )
                    // /corrections/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(correction::reject_correction)),
                    ),
            )
            .service(
                web::scope("/work-rules")
                    // /work-rules
                    .service(web::resource("").route(web::get().to(work_rule::list_rules)))
                    // /work-rules/assignments/{user_id}
                    .service(
                        web::resource("/assignments/{user_id}")
                            .route(web::get().to(work_rule::assignment_history))
                            .route(web::put().to(work_rule::assign_rule)),
                    )
                    // /work-rules/{id}
                    .service(web::resource("/{id}").route(web::put().to(work_rule::update_rule))),
            )
            .service(
                web::scope("/reports")
                    // /reports/monthly?month=YYYY-MM
                    .service(web::resource("/monthly").route(web::get().to(report::monthly_report))),
            ),
    );
}
