use std::sync::Arc;

use crate::chat::{ChatService, Hub};
use crate::rpc::AuthClient;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub chat: ChatService,
    pub auth: Arc<dyn AuthClient>,
}
