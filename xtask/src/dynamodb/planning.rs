//! Pure functions for calculating deployment plans (Functional Core).

use super::config::{GsiConfig, StreamView, TableConfig};

/// Represents the current state of a table.
#[derive(Debug, Clone)]
pub struct TableState {
    pub status: TableStatus,
    pub gsis: Vec<GsiState>,
    pub stream_enabled: bool,
    pub stream_arn: Option<String>,
}

/// Table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

impl TableStatus {
    fn label(self) -> &'static str {
        match self {
            TableStatus::Active => "ACTIVE",
            TableStatus::Creating => "CREATING",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
        }
    }
}

/// GSI state.
#[derive(Debug, Clone)]
pub struct GsiState {
    pub name: String,
    pub status: GsiStatus,
}

/// GSI status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GsiStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

impl GsiStatus {
    fn label(self) -> &'static str {
        match self {
            GsiStatus::Active => "ACTIVE",
            GsiStatus::Creating => "CREATING",
            GsiStatus::Updating => "UPDATING",
            GsiStatus::Deleting => "DELETING",
        }
    }
}

/// Planned changes for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPlan {
    /// Table doesn't exist, needs to be created.
    CreateTable { config: TableConfig },
    /// Table exists but is missing GSIs or its stream.
    UpdateTable {
        table_name: String,
        gsis_to_add: Vec<GsiConfig>,
        enable_stream: Option<StreamView>,
    },
    /// Table is up to date, no changes needed.
    NoChanges { table_name: String },
}

impl DeployPlan {
    /// Number of DynamoDB operations the plan applies. Table creation
    /// counts as one.
    pub fn pending_changes(&self) -> usize {
        match self {
            DeployPlan::CreateTable { .. } => 1,
            DeployPlan::UpdateTable {
                gsis_to_add,
                enable_stream,
                ..
            } => gsis_to_add.len() + usize::from(enable_stream.is_some()),
            DeployPlan::NoChanges { .. } => 0,
        }
    }
}

/// Plan for destroying a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPlan {
    /// Table exists and will be deleted.
    DeleteTable { table_name: String },
    /// Table doesn't exist, nothing to do.
    AlreadyGone { table_name: String },
}

/// Pure function: Calculate what changes are needed to reach desired state.
pub fn calculate_deploy_plan(current: Option<&TableState>, desired: &TableConfig) -> DeployPlan {
    let Some(state) = current else {
        return DeployPlan::CreateTable {
            config: desired.clone(),
        };
    };

    let existing_gsi_names: Vec<&str> = state.gsis.iter().map(|g| g.name.as_str()).collect();
    let gsis_to_add: Vec<GsiConfig> = desired
        .gsis
        .iter()
        .filter(|gsi| !existing_gsi_names.contains(&gsi.name.as_str()))
        .cloned()
        .collect();

    let enable_stream = desired.stream.filter(|_| !state.stream_enabled);

    if gsis_to_add.is_empty() && enable_stream.is_none() {
        DeployPlan::NoChanges {
            table_name: desired.table_name.clone(),
        }
    } else {
        DeployPlan::UpdateTable {
            table_name: desired.table_name.clone(),
            gsis_to_add,
            enable_stream,
        }
    }
}

/// Pure function: Calculate destroy plan.
pub fn calculate_destroy_plan(current: Option<&TableState>, table_name: &str) -> DestroyPlan {
    match current {
        Some(_) => DestroyPlan::DeleteTable {
            table_name: table_name.to_string(),
        },
        None => DestroyPlan::AlreadyGone {
            table_name: table_name.to_string(),
        },
    }
}

fn format_stream(view: StreamView) -> &'static str {
    match view {
        StreamView::NewAndOldImages => "NEW_AND_OLD_IMAGES",
    }
}

/// Pure function: Format a deploy plan for display.
pub fn format_deploy_plan(plan: &DeployPlan) -> Vec<String> {
    match plan {
        DeployPlan::CreateTable { config } => {
            let mut lines = vec![
                format!("+ Create table: {}", config.table_name),
                format!(
                    "  Partition key: {} ({})",
                    config.partition_key.name,
                    config.partition_key.attribute_type.code()
                ),
            ];
            if let Some(sk) = &config.sort_key {
                lines.push(format!(
                    "  Sort key: {} ({})",
                    sk.name,
                    sk.attribute_type.code()
                ));
            }
            for gsi in &config.gsis {
                lines.push(format!("  + GSI: {}", gsi.name));
                lines.push(format!(
                    "    Partition key: {} ({})",
                    gsi.partition_key.name,
                    gsi.partition_key.attribute_type.code()
                ));
                if let Some(sk) = &gsi.sort_key {
                    lines.push(format!(
                        "    Sort key: {} ({})",
                        sk.name,
                        sk.attribute_type.code()
                    ));
                }
            }
            if let Some(view) = config.stream {
                lines.push(format!("  Stream: {}", format_stream(view)));
            }
            lines.push("  Billing: PAY_PER_REQUEST".to_string());
            lines
        }
        DeployPlan::UpdateTable {
            table_name,
            gsis_to_add,
            enable_stream,
        } => {
            let mut lines = vec![format!("~ Update table: {}", table_name)];
            for gsi in gsis_to_add {
                lines.push(format!("  + Add GSI: {}", gsi.name));
            }
            if let Some(view) = enable_stream {
                lines.push(format!("  + Enable stream: {}", format_stream(*view)));
            }
            lines
        }
        DeployPlan::NoChanges { table_name } => {
            vec![format!("= Table '{}' is up to date", table_name)]
        }
    }
}

/// Pure function: Format a destroy plan for display.
pub fn format_destroy_plan(plan: &DestroyPlan) -> Vec<String> {
    match plan {
        DestroyPlan::DeleteTable { table_name } => {
            vec![format!(
                "- Delete table: {} (ALL DATA WILL BE LOST)",
                table_name
            )]
        }
        DestroyPlan::AlreadyGone { table_name } => {
            vec![format!("= Table '{}' does not exist", table_name)]
        }
    }
}

/// Pure function: Describe the live table against the desired layout.
///
/// `+` marks what a deploy would add, `~` marks indexes the server never
/// queries.
pub fn format_table_status(current: Option<&TableState>, desired: &TableConfig) -> Vec<String> {
    let Some(state) = current else {
        return vec![format!("+ Table '{}' does not exist", desired.table_name)];
    };

    let mut lines = vec![format!(
        "= Table '{}' is {}",
        desired.table_name,
        state.status.label()
    )];
    for gsi in &desired.gsis {
        match state.gsis.iter().find(|live| live.name == gsi.name) {
            Some(live) => lines.push(format!("  = {} {}", gsi.name, live.status.label())),
            None => lines.push(format!("  + {} missing", gsi.name)),
        }
    }
    for live in &state.gsis {
        if !desired.gsis.iter().any(|gsi| gsi.name == live.name) {
            lines.push(format!("  ~ {} is not used by the server", live.name));
        }
    }
    match (&state.stream_arn, state.stream_enabled) {
        (Some(arn), true) => lines.push(format!("  = Stream {arn}")),
        (None, true) => lines.push("  = Stream enabled".to_string()),
        (_, false) if desired.stream.is_some() => {
            lines.push("  + Stream disabled, hooks will not run".to_string())
        }
        (_, false) => {}
    }
    lines
}
