//! Geometry primitives.

use std::fmt;

/// Anything with an area.
pub trait Shape {
    fn area(&self) -> f64;

    fn describe(&self) -> String {
        format!("shape with area {}", self.area())
    }
}

/// A circle centred at the origin.
#[derive(Debug, Clone)]
pub struct Circle {
    radius: f64,
}

impl Circle {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circle({})", self.radius)
    }
}

pub mod units {
    pub fn to_degrees(radians: f64) -> f64 {
        radians.to_degrees()
    }
}

pub async fn load(path: &str) -> std::io::Result<String> {
    tokio::fs::read_to_string(path).await
}
