use nf_llm::Gateway;
use nf_personalize::Personalizer;
use std::sync::Arc;

pub struct AppState {
    pub personalizer: Arc<Personalizer>,
    pub gateway: Arc<Gateway>,
}
