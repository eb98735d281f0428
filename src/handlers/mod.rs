pub mod handler;
pub mod html;
pub mod images;
pub mod registry;

pub use handler::{FetchContext, TypeHandler};
pub use html::HtmlHandler;
pub use images::ImageHandler;
pub use registry::{Registry, RegistryBuilder, RegistryError};

use std::sync::Arc;

use crate::assets::AssetImporter;
use crate::fetcher::HttpClient;

/// Register the built-in image and HTML handlers, images first.
pub fn register_builtin(
    builder: &mut RegistryBuilder,
    client: Arc<dyn HttpClient>,
    importer: Arc<dyn AssetImporter>,
) -> Result<(), RegistryError> {
    for (content_type, title) in images::IMAGE_TYPES {
        builder.register(
            content_type,
            Arc::new(ImageHandler::new(title, importer.clone())),
        )?;
    }
    builder.register(html::HTML_TYPE, Arc::new(HtmlHandler::new(client, importer)))?;
    Ok(())
}
