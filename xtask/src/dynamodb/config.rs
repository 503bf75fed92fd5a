//! Table configuration types (Functional Core - pure data).

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub gsis: Vec<GsiConfig>,
    pub billing_mode: BillingMode,
    pub stream: Option<StreamView>,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// DynamoDB attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
}

impl AttributeType {
    /// Short type code as shown by the AWS console.
    pub fn code(&self) -> &'static str {
        match self {
            AttributeType::String => "S",
            AttributeType::Number => "N",
        }
    }
}

/// Global Secondary Index configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsiConfig {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub projection: ProjectionType,
}

/// GSI projection type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionType {
    All,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

/// What the table stream carries for each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamView {
    NewAndOldImages,
}

impl TableConfig {
    /// Sets the table name.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table_name = name.to_string();
        self
    }
}

fn string_key(name: &str) -> KeyAttribute {
    KeyAttribute {
        name: name.to_string(),
        attribute_type: AttributeType::String,
    }
}

fn gsi(name: &str, prefix: &str, sort_type: AttributeType) -> GsiConfig {
    GsiConfig {
        name: name.to_string(),
        partition_key: string_key(&format!("{prefix}PartitionKey")),
        sort_key: Some(KeyAttribute {
            name: format!("{prefix}SortKey"),
            attribute_type: sort_type,
        }),
        projection: ProjectionType::All,
    }
}

/// Returns the canonical table configuration for the REAL backend.
/// This is a pure function - no I/O.
///
/// The index names and key attributes must stay in sync with the
/// server's `storage::dynamodb::keys` module.
pub fn real_table_config() -> TableConfig {
    TableConfig {
        table_name: "real".to_string(),
        partition_key: string_key("partitionKey"),
        sort_key: Some(string_key("sortKey")),
        gsis: vec![
            gsi("GSI-A1", "gsiA1", AttributeType::String),
            gsi("GSI-A2", "gsiA2", AttributeType::String),
            gsi("GSI-A3", "gsiA3", AttributeType::String),
            gsi("GSI-K1", "gsiK1", AttributeType::String),
            gsi("GSI-K2", "gsiK2", AttributeType::String),
            gsi("GSI-K3", "gsiK3", AttributeType::Number),
        ],
        billing_mode: BillingMode::PayPerRequest,
        stream: Some(StreamView::NewAndOldImages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_table_indexes() {
        let config = real_table_config();
        let names: Vec<&str> = config.gsis.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            ["GSI-A1", "GSI-A2", "GSI-A3", "GSI-K1", "GSI-K2", "GSI-K3"]
        );
        assert_eq!(config.gsis[3].partition_key.name, "gsiK1PartitionKey");
        assert_eq!(
            config.gsis[5].sort_key.as_ref().map(|k| k.attribute_type),
            Some(AttributeType::Number)
        );
        assert_eq!(config.stream, Some(StreamView::NewAndOldImages));
    }

    #[test]
    fn test_with_table_name() {
        let config = real_table_config().with_table_name("real-dev");
        assert_eq!(config.table_name, "real-dev");
    }
}
