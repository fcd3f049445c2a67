/// Process-wide dashboard state, built once at startup and shared read-only
use crate::chart::ChartOptions;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::DatasetError;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub dataset: Arc<Dataset>,
    pub group_by: String,
    pub page_size: usize,
    pub chart: ChartOptions,
    pub debug: bool,
}

impl DashboardContext {
    pub fn new(dataset: Arc<Dataset>, config: &Config) -> Self {
        DashboardContext {
            dataset,
            group_by: config.group_by.clone(),
            page_size: config.page_size,
            chart: ChartOptions::default(),
            debug: config.debug,
        }
    }

    /// Load the configured dataset (or the bundled one) and build the context.
    ///
    /// The grouping column must exist in the loaded schema.
    pub fn load(config: &Config) -> Result<Self, DatasetError> {
        let dataset = match &config.data_path {
            Some(path) => Dataset::from_path(path)?,
            None => Dataset::bundled()?,
        };

        if dataset.schema().get_column_index(&config.group_by).is_none() {
            return Err(DatasetError::InvalidFormat(format!(
                "grouping column '{}' not found in '{}'",
                config.group_by,
                dataset.name()
            )));
        }

        log::info!(
            "Loaded dataset '{}': {} rows, {} columns",
            dataset.name(),
            dataset.len(),
            dataset.schema().len()
        );

        Ok(Self::new(Arc::new(dataset), config))
    }
}
