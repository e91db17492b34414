use std::f64::consts::PI;

use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{MontageError, MontageResult};

/// Spiral trajectory followed by each fragment.
///
/// With damping `d(t) = 1 / (bias + t^power)` and base angle `a = i·π/n`, fragment `i` of `n`
/// sits at `p0 + amplitude·d·R(swirl·d·a)·v` where `v = (-cos a, sin a)` with `v.y` negated for
/// odd `i`. `R(θ)` is `[[cos θ, sin θ], [-sin θ, cos θ]]`. The offset is largest at `t = 0` and
/// decays to zero as `t` grows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionCurve {
    /// Peak displacement scale in pixels.
    pub amplitude: f64,
    /// Damping floor; bounds the displacement at `t = 0`.
    pub bias: f64,
    /// Damping exponent.
    pub power: f64,
    /// Strength of the secondary rotation.
    pub swirl: f64,
}

impl Default for MotionCurve {
    fn default() -> Self {
        Self {
            amplitude: 400.0,
            bias: 0.3,
            power: 8.0,
            swirl: 0.5,
        }
    }
}

impl MotionCurve {
    pub(crate) fn validate(&self) -> MontageResult<()> {
        for (name, v) in [
            ("amplitude", self.amplitude),
            ("bias", self.bias),
            ("power", self.power),
            ("swirl", self.swirl),
        ] {
            if !v.is_finite() {
                return Err(MontageError::validation(format!(
                    "particle {name} must be finite"
                )));
            }
        }
        if self.bias <= 0.0 {
            return Err(MontageError::validation(format!(
                "particle bias must be > 0, got {}",
                self.bias
            )));
        }
        if self.power <= 0.0 {
            return Err(MontageError::validation(format!(
                "particle power must be > 0, got {}",
                self.power
            )));
        }
        Ok(())
    }

    /// Damping factor at elapsed time `t`.
    pub fn damping(&self, t: f64) -> f64 {
        1.0 / (self.bias + t.max(0.0).powf(self.power))
    }

    /// Displacement of fragment `i` of `n` from its rest position at elapsed time `t`.
    pub fn offset(&self, i: usize, n: usize, t: f64) -> Vec2 {
        if n == 0 {
            return Vec2::ZERO;
        }
        let d = self.damping(t);
        let a = (i as f64) * PI / (n as f64);
        let mut v = Vec2::new(-a.cos(), a.sin());
        if i % 2 == 1 {
            v.y = -v.y;
        }

        let (s, c) = (self.swirl * d * a).sin_cos();
        let turned = Vec2::new(c * v.x + s * v.y, -s * v.x + c * v.y);
        turned * (self.amplitude * d)
    }

    /// Position of fragment `i` of `n` resting at `p0`.
    pub fn position(&self, i: usize, n: usize, p0: Point, t: f64) -> Point {
        p0 + self.offset(i, n, t)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/particles/motion.rs"]
mod tests;
