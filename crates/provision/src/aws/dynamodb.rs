//! DynamoDB table operations.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, CreateGlobalSecondaryIndexAction, GlobalSecondaryIndex,
    GlobalSecondaryIndexUpdate, IndexStatus as SdkIndexStatus, KeySchemaElement, KeyType,
    Projection as SdkProjection, ProjectionType, ProvisionedThroughput, ScalarAttributeType,
    TableStatus as SdkTableStatus,
};
use explorespeak_core::manifest::{
    AttributeType, CapacityMode, IndexSpec, KeyAttribute, Projection, TableSpec,
};
use explorespeak_core::provider::{
    IndexState, IndexStatus, ProviderError, Result, TableProvider, TableState, TableStatus,
};

use super::client::AwsCloud;
use super::error::{map_build_error, map_create_error, map_sdk_error};

const KIND: &str = "Table";

#[async_trait]
impl TableProvider for AwsCloud {
    async fn describe_table(&self, name: &str) -> Result<Option<TableState>> {
        let response = match self.dynamodb.describe_table().table_name(name).send().await {
            Ok(response) => response,
            Err(err) => {
                let err = map_sdk_error(err, KIND, name);
                return if err.is_not_found() { Ok(None) } else { Err(err) };
            }
        };

        let table = response.table().ok_or_else(|| {
            ProviderError::Request(format!("DescribeTable returned no table for '{name}'"))
        })?;

        let indexes = table
            .global_secondary_indexes()
            .iter()
            .map(|index| IndexState {
                name: index.index_name().unwrap_or_default().to_string(),
                status: match index.index_status() {
                    Some(SdkIndexStatus::Creating) => IndexStatus::Creating,
                    Some(SdkIndexStatus::Updating) => IndexStatus::Updating,
                    Some(SdkIndexStatus::Deleting) => IndexStatus::Deleting,
                    _ => IndexStatus::Active,
                },
            })
            .collect();

        let status = match table.table_status() {
            Some(SdkTableStatus::Active) => TableStatus::Active,
            Some(SdkTableStatus::Creating) => TableStatus::Creating,
            Some(SdkTableStatus::Updating) => TableStatus::Updating,
            Some(SdkTableStatus::Deleting) => TableStatus::Deleting,
            _ => TableStatus::Other,
        };

        Ok(Some(TableState { status, indexes }))
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut request = self
            .dynamodb
            .create_table()
            .table_name(&spec.name)
            .set_key_schema(Some(key_schema(&spec.partition_key, spec.sort_key.as_ref())?))
            .set_attribute_definitions(Some(attribute_definitions(&spec.key_attributes())?));

        request = match spec.capacity {
            CapacityMode::PayPerRequest => request.billing_mode(BillingMode::PayPerRequest),
            CapacityMode::Provisioned { .. } => request
                .billing_mode(BillingMode::Provisioned)
                .provisioned_throughput(throughput(spec.capacity)?),
        };

        for index in &spec.indexes {
            let mut builder = GlobalSecondaryIndex::builder()
                .index_name(&index.name)
                .set_key_schema(Some(key_schema(
                    &index.partition_key,
                    index.sort_key.as_ref(),
                )?))
                .projection(projection(&index.projection));
            if let CapacityMode::Provisioned { .. } = spec.capacity {
                builder = builder.provisioned_throughput(throughput(spec.capacity)?);
            }
            request = request.global_secondary_indexes(builder.build().map_err(map_build_error)?);
        }

        request
            .send()
            .await
            .map_err(|e| map_create_error(e, KIND, &spec.name))?;
        Ok(())
    }

    async fn add_index(&self, table: &TableSpec, index: &IndexSpec) -> Result<()> {
        let mut action = CreateGlobalSecondaryIndexAction::builder()
            .index_name(&index.name)
            .set_key_schema(Some(key_schema(
                &index.partition_key,
                index.sort_key.as_ref(),
            )?))
            .projection(projection(&index.projection));
        if let CapacityMode::Provisioned { .. } = table.capacity {
            action = action.provisioned_throughput(throughput(table.capacity)?);
        }

        self.dynamodb
            .update_table()
            .table_name(&table.name)
            .set_attribute_definitions(Some(attribute_definitions(&index.key_attributes())?))
            .global_secondary_index_updates(
                GlobalSecondaryIndexUpdate::builder()
                    .create(action.build().map_err(map_build_error)?)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| map_sdk_error(e, KIND, &table.name))?;
        Ok(())
    }
}

fn key_schema(
    partition_key: &KeyAttribute,
    sort_key: Option<&KeyAttribute>,
) -> Result<Vec<KeySchemaElement>> {
    let mut schema = vec![KeySchemaElement::builder()
        .attribute_name(&partition_key.name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(map_build_error)?];

    if let Some(sk) = sort_key {
        schema.push(
            KeySchemaElement::builder()
                .attribute_name(&sk.name)
                .key_type(KeyType::Range)
                .build()
                .map_err(map_build_error)?,
        );
    }
    Ok(schema)
}

fn attribute_definitions(attributes: &[&KeyAttribute]) -> Result<Vec<AttributeDefinition>> {
    attributes
        .iter()
        .map(|attribute| {
            AttributeDefinition::builder()
                .attribute_name(&attribute.name)
                .attribute_type(to_scalar_type(attribute.attribute_type))
                .build()
                .map_err(map_build_error)
        })
        .collect()
}

fn projection(projection: &Projection) -> SdkProjection {
    match projection {
        Projection::All => SdkProjection::builder()
            .projection_type(ProjectionType::All)
            .build(),
        Projection::KeysOnly => SdkProjection::builder()
            .projection_type(ProjectionType::KeysOnly)
            .build(),
        Projection::Include(attributes) => SdkProjection::builder()
            .projection_type(ProjectionType::Include)
            .set_non_key_attributes(Some(attributes.clone()))
            .build(),
    }
}

fn throughput(capacity: CapacityMode) -> Result<ProvisionedThroughput> {
    let (read, write) = match capacity {
        CapacityMode::Provisioned {
            read_units,
            write_units,
        } => (read_units, write_units),
        CapacityMode::PayPerRequest => (0, 0),
    };
    ProvisionedThroughput::builder()
        .read_capacity_units(read)
        .write_capacity_units(write)
        .build()
        .map_err(map_build_error)
}

fn to_scalar_type(attr_type: AttributeType) -> ScalarAttributeType {
    match attr_type {
        AttributeType::String => ScalarAttributeType::S,
        AttributeType::Number => ScalarAttributeType::N,
        AttributeType::Binary => ScalarAttributeType::B,
    }
}
