//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and transforms
//! - Culling geometry (boxes, planes, plane sets, polygons, screen rectangles)
//! - Time management
//! - Logging utilities

pub mod math;
pub mod geometry;
pub mod time;
pub mod logging;
