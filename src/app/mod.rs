//! Demo service shipped with the binary: a small user store plus two stub
//! nodes, enough to exercise every part of the pipeline on any engine.

pub mod api;
pub mod db;
pub mod users;

use crate::routes::HandlerRegistry;

/// The demo route tree
pub fn registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register("users", users::build)
        .register("api", api::build)
        .register("db", db::build);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_declares_three_nodes() {
        let registry = registry();
        let segments: Vec<_> = registry.entries().iter().map(|e| e.segment).collect();
        assert_eq!(segments, vec!["users", "api", "db"]);
    }
}
