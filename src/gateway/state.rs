use std::sync::Arc;

use crate::resolver::Resolver;

#[derive(Clone)]
pub struct HandlerState {
    pub resolver: Arc<Resolver>,
}

impl HandlerState {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }
}
