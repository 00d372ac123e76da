// extras endpoints: tags and custom fields.

use tracing::debug;

use crate::client::NetboxClient;
use crate::error::Error;
use crate::types::{CustomField, NewCustomField, NewTag, Tag};

impl NetboxClient {
    /// Look up a tag by slug.
    ///
    /// `GET /api/extras/tags/?slug={slug}`
    pub async fn find_tag(&self, slug: &str) -> Result<Option<Tag>, Error> {
        self.find_one("extras/tags/", &[("slug", slug.to_owned())])
            .await
    }

    /// `POST /api/extras/tags/`
    pub async fn create_tag(&self, tag: &NewTag) -> Result<Tag, Error> {
        debug!(slug = %tag.slug, "creating tag");
        self.post("extras/tags/", tag).await
    }

    /// Look up a custom field definition by name.
    ///
    /// `GET /api/extras/custom-fields/?name={name}`
    pub async fn find_custom_field(&self, name: &str) -> Result<Option<CustomField>, Error> {
        self.find_one("extras/custom-fields/", &[("name", name.to_owned())])
            .await
    }

    /// `POST /api/extras/custom-fields/`
    pub async fn create_custom_field(&self, field: &NewCustomField) -> Result<CustomField, Error> {
        debug!(name = %field.name, "creating custom field");
        self.post("extras/custom-fields/", field).await
    }
}
