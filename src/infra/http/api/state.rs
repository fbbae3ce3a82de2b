use std::sync::Arc;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::categories::AdminCategoryService;
use crate::application::admin::pages::AdminPageService;
use crate::application::admin::projects::AdminProjectService;
use crate::application::admin::uploads::AdminUploadService;

#[derive(Clone)]
pub struct ApiState {
    pub categories: Arc<AdminCategoryService>,
    pub projects: Arc<AdminProjectService>,
    pub pages: Arc<AdminPageService>,
    pub uploads: Arc<AdminUploadService>,
    pub audit: Arc<AdminAuditService>,
}
