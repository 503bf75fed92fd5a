//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `RepositoryError` from `real_core::storage`.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use real_core::storage::RepositoryError;

const THROUGHPUT_EXCEEDED: &str = "Throughput exceeded, please retry";
const REQUEST_LIMIT_EXCEEDED: &str = "Request limit exceeded, please retry";
const INTERNAL_SERVER_ERROR: &str = "DynamoDB internal server error";
const TABLE_NOT_FOUND: &str = "Table not found";

fn query_failed(message: &str) -> RepositoryError {
    RepositoryError::QueryFailed(message.to_string())
}

/// Map a GetItem SDK error to RepositoryError.
pub fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(_) => RepositoryError::not_found(entity_type, id),
        GetItemError::ProvisionedThroughputExceededException(_) => query_failed(THROUGHPUT_EXCEEDED),
        GetItemError::RequestLimitExceeded(_) => query_failed(REQUEST_LIMIT_EXCEEDED),
        GetItemError::InternalServerError(_) => query_failed(INTERNAL_SERVER_ERROR),
        err => RepositoryError::QueryFailed(format!("GetItem failed: {:?}", err)),
    }
}

/// Map a Query SDK error to RepositoryError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
) -> RepositoryError {
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => query_failed(TABLE_NOT_FOUND),
        QueryError::ProvisionedThroughputExceededException(_) => query_failed(THROUGHPUT_EXCEEDED),
        QueryError::RequestLimitExceeded(_) => query_failed(REQUEST_LIMIT_EXCEEDED),
        QueryError::InternalServerError(_) => query_failed(INTERNAL_SERVER_ERROR),
        err => RepositoryError::QueryFailed(format!("Query failed: {:?}", err)),
    }
}

/// Map a PutItem SDK error to RepositoryError.
///
/// Puts are conditional on the item not existing yet, so a failed
/// condition means the item is already there.
pub fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => {
            RepositoryError::already_exists(entity_type, id)
        }
        PutItemError::ResourceNotFoundException(_) => query_failed(TABLE_NOT_FOUND),
        PutItemError::ProvisionedThroughputExceededException(_) => query_failed(THROUGHPUT_EXCEEDED),
        PutItemError::RequestLimitExceeded(_) => query_failed(REQUEST_LIMIT_EXCEEDED),
        PutItemError::ItemCollectionSizeLimitExceededException(_) => {
            query_failed("Item collection size limit exceeded")
        }
        PutItemError::TransactionConflictException(_) => {
            query_failed("Transaction conflict, please retry")
        }
        PutItemError::InternalServerError(_) => query_failed(INTERNAL_SERVER_ERROR),
        err => RepositoryError::QueryFailed(format!("PutItem failed: {:?}", err)),
    }
}

/// Map an UpdateItem SDK error to RepositoryError.
///
/// `on_condition` builds the error for a failed condition check: a missing
/// item for plain updates, a refused decrement for counters.
pub fn map_update_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<UpdateItemError, R>,
    on_condition: impl FnOnce() -> RepositoryError,
) -> RepositoryError {
    match err.into_service_error() {
        UpdateItemError::ConditionalCheckFailedException(_) => on_condition(),
        UpdateItemError::ResourceNotFoundException(_) => query_failed(TABLE_NOT_FOUND),
        UpdateItemError::ProvisionedThroughputExceededException(_) => {
            query_failed(THROUGHPUT_EXCEEDED)
        }
        UpdateItemError::RequestLimitExceeded(_) => query_failed(REQUEST_LIMIT_EXCEEDED),
        UpdateItemError::ItemCollectionSizeLimitExceededException(_) => {
            query_failed("Item collection size limit exceeded")
        }
        UpdateItemError::TransactionConflictException(_) => {
            query_failed("Transaction conflict, please retry")
        }
        UpdateItemError::InternalServerError(_) => query_failed(INTERNAL_SERVER_ERROR),
        err => RepositoryError::QueryFailed(format!("UpdateItem failed: {:?}", err)),
    }
}

/// Map a DeleteItem SDK error to RepositoryError.
pub fn map_delete_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteItemError, R>,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    match err.into_service_error() {
        DeleteItemError::ConditionalCheckFailedException(_) => {
            RepositoryError::not_found(entity_type, id)
        }
        DeleteItemError::ResourceNotFoundException(_) => query_failed(TABLE_NOT_FOUND),
        DeleteItemError::ProvisionedThroughputExceededException(_) => {
            query_failed(THROUGHPUT_EXCEEDED)
        }
        DeleteItemError::RequestLimitExceeded(_) => query_failed(REQUEST_LIMIT_EXCEEDED),
        DeleteItemError::ItemCollectionSizeLimitExceededException(_) => {
            query_failed("Item collection size limit exceeded")
        }
        DeleteItemError::TransactionConflictException(_) => {
            query_failed("Transaction conflict, please retry")
        }
        DeleteItemError::InternalServerError(_) => query_failed(INTERNAL_SERVER_ERROR),
        err => RepositoryError::QueryFailed(format!("DeleteItem failed: {:?}", err)),
    }
}

/// Map a BatchWriteItem SDK error to RepositoryError.
pub fn map_batch_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchWriteItemError, R>,
) -> RepositoryError {
    match err.into_service_error() {
        BatchWriteItemError::ResourceNotFoundException(_) => query_failed(TABLE_NOT_FOUND),
        BatchWriteItemError::ProvisionedThroughputExceededException(_) => {
            query_failed(THROUGHPUT_EXCEEDED)
        }
        BatchWriteItemError::RequestLimitExceeded(_) => query_failed(REQUEST_LIMIT_EXCEEDED),
        BatchWriteItemError::InternalServerError(_) => query_failed(INTERNAL_SERVER_ERROR),
        err => RepositoryError::QueryFailed(format!("BatchWriteItem failed: {:?}", err)),
    }
}
