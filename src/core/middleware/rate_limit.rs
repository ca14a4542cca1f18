//! Global rate limiting built atop `governor`.

use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};

use crate::{
    config::models::RateLimitConfig,
    ports::handler::{SharedHandler, handler_fn},
    routes::envelope::error_body,
};

pub type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Build the governor limiter from a window string and a request quota
pub fn build_limiter(config: &RateLimitConfig) -> Result<DirectRateLimiter, String> {
    let window = humantime::parse_duration(&config.window).map_err(|e| {
        format!(
            "Invalid window string '{window}': {e}",
            window = config.window
        )
    })?;

    let max = NonZeroU32::new(config.max)
        .ok_or_else(|| "Rate limit 'max' must be greater than 0".to_string())?;

    // `max` cells per window: replenish one every window/max, burst up to max
    let quota = Quota::with_period(window / max.get())
        .ok_or_else(|| format!("Invalid window duration: {window:?}"))?
        .allow_burst(max);

    Ok(RateLimiter::direct(quota))
}

/// Middleware rejecting over-quota requests with a 429 envelope
pub fn rate_limit_handler(config: &RateLimitConfig) -> Result<SharedHandler, String> {
    let limiter = Arc::new(build_limiter(config)?);
    tracing::info!(
        "Creating rate limiter: window={}, max={}",
        config.window,
        config.max
    );

    Ok(handler_fn(move |_req, res| {
        let limiter = limiter.clone();
        async move {
            if limiter.check().is_err() {
                res.set_status(429);
                res.send_json(&error_body(429, "rate limit exceeded"))?;
            }
            Ok(())
        }
    }))
}
