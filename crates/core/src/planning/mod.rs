//! Desired-vs-observed diffing. Every function here is pure.

pub mod functions;
pub mod gateway;
pub mod tables;

pub use functions::{configuration_drift, format_function_plan, plan_function, FunctionPlan};
pub use gateway::{
    execute_api_source_arn, format_gateway_plan, integration_uri, permission_statement_id,
    plan_methods, plan_resources, required_paths, ArnParts, MethodAction, MethodPlan,
    PlannedResource, ResourcePlan, ResponseMapping, PROXY_RESPONSES,
};
pub use tables::{format_table_plan, plan_table, TablePlan};
