//! Engine notifications.

use crate::optimizer::TrayLayoutResult;
use crate::types::Point;

/// Broadcast after engine state mutations. Within one logical update the COM
/// event always precedes the displacement event; a geometry change is
/// announced after both.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    GeometryChanged,
    ComUpdated(Point),
    DisplacementUpdated(Point),
    LayoutReady(TrayLayoutResult),
}
