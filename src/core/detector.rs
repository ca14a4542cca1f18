//! Engine detection.
//!
//! The registry is compiled in: an engine is available exactly when its
//! cargo feature is enabled, so selection is deterministic for a given
//! build. Priority follows capability, async engines first.

use once_cell::sync::Lazy;

use crate::ports::engine::{EngineError, EngineId, EngineResult};

/// One selectable engine and how to tell whether this build carries it
#[derive(Clone, Copy)]
pub struct EngineDescriptor {
    pub id: EngineId,
    pub priority: u8,
    pub available: fn() -> bool,
}

/// Compiled-in engine registry, highest priority first
static REGISTRY: Lazy<Vec<EngineDescriptor>> = Lazy::new(|| {
    vec![
        EngineDescriptor {
            id: EngineId::Axum,
            priority: 0,
            available: || cfg!(feature = "engine-axum"),
        },
        EngineDescriptor {
            id: EngineId::ActixWeb,
            priority: 1,
            available: || cfg!(feature = "engine-actix"),
        },
        EngineDescriptor {
            id: EngineId::Hyper,
            priority: 2,
            available: || cfg!(feature = "engine-hyper"),
        },
        EngineDescriptor {
            id: EngineId::Rouille,
            priority: 3,
            available: || cfg!(feature = "engine-rouille"),
        },
        EngineDescriptor {
            id: EngineId::TinyHttp,
            priority: 4,
            available: || cfg!(feature = "engine-tiny-http"),
        },
    ]
});

/// All known engines in priority order
pub fn registry() -> &'static [EngineDescriptor] {
    &REGISTRY
}

/// Pick the engine to run.
///
/// An explicit preference wins when its feature is compiled in and fails
/// loudly when it is not; with no preference the highest-priority available
/// engine is chosen.
pub fn select(preferred: Option<EngineId>) -> EngineResult<EngineId> {
    select_from(registry(), preferred)
}

fn select_from(
    descriptors: &[EngineDescriptor],
    preferred: Option<EngineId>,
) -> EngineResult<EngineId> {
    if let Some(id) = preferred {
        let descriptor = descriptors
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| EngineError::Unknown(id.as_str().to_string()))?;
        return if (descriptor.available)() {
            Ok(id)
        } else {
            Err(EngineError::Unavailable(id))
        };
    }

    let mut candidates: Vec<_> = descriptors.iter().filter(|d| (d.available)()).collect();
    candidates.sort_by_key(|d| d.priority);
    candidates
        .first()
        .map(|d| d.id)
        .ok_or(EngineError::NoneAvailable)
}
