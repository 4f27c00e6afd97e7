//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::dto::{
    AutoShutOffRequest, DeviceDetailResponse, DeviceListResponse, DeviceSummaryDto,
    PatchOutcomeDto, ReadingsResponse, RefreshResponse, ValveAction, ValveRequest,
};
use crate::api::handlers::system::HealthResponse;
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "sonic-bridge",
        description = "State synchronizer and webhook bridge for Sonic smart water valves."
    ),
    paths(
        crate::api::handlers::system::health_handler,
        crate::api::handlers::device::list_devices,
        crate::api::handlers::device::get_device,
        crate::api::handlers::device::get_readings,
        crate::api::handlers::device::refresh_device,
        crate::api::handlers::control::set_valve,
        crate::api::handlers::control::set_auto_shut_off,
        crate::api::handlers::webhook::receive_webhook,
    ),
    components(schemas(
        HealthResponse,
        DeviceSummaryDto,
        DeviceListResponse,
        DeviceDetailResponse,
        ReadingsResponse,
        RefreshResponse,
        ValveAction,
        ValveRequest,
        AutoShutOffRequest,
        PatchOutcomeDto,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Devices", description = "Device snapshots and readings"),
        (name = "Control", description = "Valve and auto shut-off commands"),
        (name = "Webhook", description = "Device push events"),
    )
)]
pub struct ApiDoc;
