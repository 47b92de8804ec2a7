use std::sync::Arc;

use certwatch_db::storage::Storage;
use certwatch_service::CertificateService;

#[derive(Clone)]
pub struct ApiContext {
    pub certificates: Arc<dyn CertificateService>,
    pub db: Arc<dyn Storage>,
}

impl ApiContext {
    pub fn new(certificates: Arc<dyn CertificateService>, db: Arc<dyn Storage>) -> Self {
        Self { certificates, db }
    }
}
