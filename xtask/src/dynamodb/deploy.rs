//! Table deployment operations (Imperative Shell).

use super::client;
use super::config::{self, StreamView, TableConfig};
use super::error::{DynamodbError, Result};
use super::planning::{DeployPlan, DestroyPlan, GsiStatus, TableStatus};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType, StreamSpecification, StreamViewType,
};
use aws_sdk_dynamodb::Client;
use std::time::Duration;

/// Execute a deploy plan.
pub async fn execute_deploy_plan(client: &Client, plan: &DeployPlan) -> Result<()> {
    match plan {
        DeployPlan::CreateTable { config } => {
            create_table(client, config).await?;
            wait_for_table_active(client, &config.table_name).await?;
        }
        DeployPlan::UpdateTable {
            table_name,
            gsis_to_add,
            enable_stream,
        } => {
            // DynamoDB accepts one index creation per UpdateTable call.
            for gsi in gsis_to_add {
                add_gsi(client, table_name, gsi).await?;
                wait_for_table_active(client, table_name).await?;
            }
            if let Some(view) = enable_stream {
                enable_table_stream(client, table_name, *view).await?;
                wait_for_table_active(client, table_name).await?;
            }
        }
        DeployPlan::NoChanges { .. } => {
            // Nothing to do
        }
    }
    Ok(())
}

/// Execute a destroy plan.
pub async fn execute_destroy_plan(client: &Client, plan: &DestroyPlan) -> Result<()> {
    match plan {
        DestroyPlan::DeleteTable { table_name } => {
            delete_table(client, table_name).await?;
        }
        DestroyPlan::AlreadyGone { .. } => {
            // Nothing to do
        }
    }
    Ok(())
}

async fn create_table(client: &Client, config: &TableConfig) -> Result<()> {
    let mut key_schema = vec![KeySchemaElement::builder()
        .attribute_name(&config.partition_key.name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(DynamodbError::aws)?];

    let mut attribute_definitions = vec![AttributeDefinition::builder()
        .attribute_name(&config.partition_key.name)
        .attribute_type(to_scalar_type(&config.partition_key.attribute_type))
        .build()
        .map_err(DynamodbError::aws)?];

    if let Some(sk) = &config.sort_key {
        key_schema.push(
            KeySchemaElement::builder()
                .attribute_name(&sk.name)
                .key_type(KeyType::Range)
                .build()
                .map_err(DynamodbError::aws)?,
        );
        attribute_definitions.push(
            AttributeDefinition::builder()
                .attribute_name(&sk.name)
                .attribute_type(to_scalar_type(&sk.attribute_type))
                .build()
                .map_err(DynamodbError::aws)?,
        );
    }

    // Add GSI attribute definitions
    for gsi in &config.gsis {
        // Add partition key if not already defined
        let pk_name = gsi.partition_key.name.as_str();
        if !attribute_definitions
            .iter()
            .any(|a| a.attribute_name() == pk_name)
        {
            attribute_definitions.push(
                AttributeDefinition::builder()
                    .attribute_name(&gsi.partition_key.name)
                    .attribute_type(to_scalar_type(&gsi.partition_key.attribute_type))
                    .build()
                    .map_err(DynamodbError::aws)?,
            );
        }

        // Add sort key if not already defined
        if let Some(sk) = &gsi.sort_key {
            let sk_name = sk.name.as_str();
            if !attribute_definitions
                .iter()
                .any(|a| a.attribute_name() == sk_name)
            {
                attribute_definitions.push(
                    AttributeDefinition::builder()
                        .attribute_name(&sk.name)
                        .attribute_type(to_scalar_type(&sk.attribute_type))
                        .build()
                        .map_err(DynamodbError::aws)?,
                );
            }
        }
    }

    let mut request = client
        .create_table()
        .table_name(&config.table_name)
        .set_key_schema(Some(key_schema))
        .set_attribute_definitions(Some(attribute_definitions))
        .billing_mode(BillingMode::PayPerRequest);

    if let Some(view) = config.stream {
        request = request.stream_specification(stream_specification(view)?);
    }

    // Add GSIs
    for gsi in &config.gsis {
        let mut gsi_key_schema = vec![KeySchemaElement::builder()
            .attribute_name(&gsi.partition_key.name)
            .key_type(KeyType::Hash)
            .build()
            .map_err(DynamodbError::aws)?];

        if let Some(sk) = &gsi.sort_key {
            gsi_key_schema.push(
                KeySchemaElement::builder()
                    .attribute_name(&sk.name)
                    .key_type(KeyType::Range)
                    .build()
                    .map_err(DynamodbError::aws)?,
            );
        }

        request = request.global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(&gsi.name)
                .set_key_schema(Some(gsi_key_schema))
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .build()
                .map_err(DynamodbError::aws)?,
        );
    }

    request
        .send()
        .await
        .map_err(DynamodbError::aws)?;
    Ok(())
}

async fn add_gsi(client: &Client, table_name: &str, gsi: &config::GsiConfig) -> Result<()> {
    use aws_sdk_dynamodb::types::{CreateGlobalSecondaryIndexAction, GlobalSecondaryIndexUpdate};

    let mut gsi_key_schema = vec![KeySchemaElement::builder()
        .attribute_name(&gsi.partition_key.name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(DynamodbError::aws)?];

    if let Some(sk) = &gsi.sort_key {
        gsi_key_schema.push(
            KeySchemaElement::builder()
                .attribute_name(&sk.name)
                .key_type(KeyType::Range)
                .build()
                .map_err(DynamodbError::aws)?,
        );
    }

    // Build attribute definitions for the GSI keys
    let mut attribute_definitions = vec![AttributeDefinition::builder()
        .attribute_name(&gsi.partition_key.name)
        .attribute_type(to_scalar_type(&gsi.partition_key.attribute_type))
        .build()
        .map_err(DynamodbError::aws)?];

    if let Some(sk) = &gsi.sort_key {
        attribute_definitions.push(
            AttributeDefinition::builder()
                .attribute_name(&sk.name)
                .attribute_type(to_scalar_type(&sk.attribute_type))
                .build()
                .map_err(DynamodbError::aws)?,
        );
    }

    client
        .update_table()
        .table_name(table_name)
        .set_attribute_definitions(Some(attribute_definitions))
        .global_secondary_index_updates(
            GlobalSecondaryIndexUpdate::builder()
                .create(
                    CreateGlobalSecondaryIndexAction::builder()
                        .index_name(&gsi.name)
                        .set_key_schema(Some(gsi_key_schema))
                        .projection(
                            Projection::builder()
                                .projection_type(ProjectionType::All)
                                .build(),
                        )
                        .build()
                        .map_err(DynamodbError::aws)?,
                )
                .build(),
        )
        .send()
        .await
        .map_err(DynamodbError::aws)?;

    Ok(())
}

async fn enable_table_stream(client: &Client, table_name: &str, view: StreamView) -> Result<()> {
    client
        .update_table()
        .table_name(table_name)
        .stream_specification(stream_specification(view)?)
        .send()
        .await
        .map_err(DynamodbError::aws)?;
    Ok(())
}

fn stream_specification(view: StreamView) -> Result<StreamSpecification> {
    let view_type = match view {
        StreamView::NewAndOldImages => StreamViewType::NewAndOldImages,
    };
    StreamSpecification::builder()
        .stream_enabled(true)
        .stream_view_type(view_type)
        .build()
        .map_err(DynamodbError::aws)
}

async fn delete_table(client: &Client, table_name: &str) -> Result<()> {
    client
        .delete_table()
        .table_name(table_name)
        .send()
        .await
        .map_err(DynamodbError::aws)?;
    Ok(())
}

const ACTIVATION_POLL: Duration = Duration::from_secs(2);
const ACTIVATION_ATTEMPTS: u32 = 60;

/// Waits until the table and every index report ACTIVE.
async fn wait_for_table_active(client: &Client, table_name: &str) -> Result<()> {
    for _ in 0..ACTIVATION_ATTEMPTS {
        if let Some(state) = client::get_table_state(client, table_name).await? {
            if state.status == TableStatus::Active {
                // Also check all GSIs are active
                let all_gsis_active = state.gsis.iter().all(|g| g.status == GsiStatus::Active);
                if all_gsis_active {
                    return Ok(());
                }
            }
        }
        tokio::time::sleep(ACTIVATION_POLL).await;
    }

    Err(DynamodbError::NotActive {
        table: table_name.to_string(),
        waited: ACTIVATION_POLL * ACTIVATION_ATTEMPTS,
    })
}

fn to_scalar_type(attr_type: &config::AttributeType) -> ScalarAttributeType {
    match attr_type {
        config::AttributeType::String => ScalarAttributeType::S,
        config::AttributeType::Number => ScalarAttributeType::N,
    }
}
