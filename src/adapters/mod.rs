#[cfg(feature = "engine-actix")]
pub mod actix_engine;
#[cfg(feature = "engine-axum")]
pub mod axum_engine;
#[cfg(feature = "engine-hyper")]
pub mod hyper_engine;
#[cfg(feature = "engine-rouille")]
pub mod rouille_engine;
pub mod shared;
#[cfg(feature = "engine-tiny-http")]
pub mod tiny_http_engine;

use tokio::runtime::Handle;

use crate::{
    config::models::AppConfig,
    ports::engine::{EngineBinding, EngineError, EngineId, EngineResult},
};

/// Construct the binding for a compiled-in engine.
///
/// An engine compiled out of this build returns
/// [`EngineError::Unavailable`]; the detector normally filters those before
/// this point.
pub fn create_binding(
    id: EngineId,
    handle: Handle,
    config: &AppConfig,
) -> EngineResult<Box<dyn EngineBinding>> {
    match id {
        #[cfg(feature = "engine-axum")]
        EngineId::Axum => Ok(Box::new(axum_engine::AxumBinding::new(handle, config))),
        #[cfg(feature = "engine-actix")]
        EngineId::ActixWeb => Ok(Box::new(actix_engine::ActixBinding::new(handle, config))),
        #[cfg(feature = "engine-hyper")]
        EngineId::Hyper => Ok(Box::new(hyper_engine::HyperBinding::new(handle, config))),
        #[cfg(feature = "engine-rouille")]
        EngineId::Rouille => Ok(Box::new(rouille_engine::RouilleBinding::new(handle, config))),
        #[cfg(feature = "engine-tiny-http")]
        EngineId::TinyHttp => Ok(Box::new(tiny_http_engine::TinyHttpBinding::new(
            handle, config,
        ))),
        #[allow(unreachable_patterns)]
        other => Err(EngineError::Unavailable(other)),
    }
}
