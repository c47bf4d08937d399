use super::Client;
use crate::collection::Collection;
use crate::cycle::Source;
use crate::error::Result;

/// Natural key of a CI inventory record.
pub const APP_NAME: &str = "appName";

/// CI pipeline tool usage, keyed by application name.
pub struct PipelineSource<'a> {
    client: &'a Client,
}

impl<'a> PipelineSource<'a> {
    pub fn new(client: &'a Client) -> Self {
        PipelineSource { client }
    }
}

impl Source for PipelineSource<'_> {
    fn name(&self) -> &'static str {
        "ci-inventory"
    }

    fn fetch(&mut self) -> Result<Collection> {
        let records = self.client.pipeline_tools()?;
        tracing::debug!(records = records.len(), "fetched ci inventory");
        Collection::from_records(records, APP_NAME)
    }
}
