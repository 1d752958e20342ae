use std::str::FromStr;

use crate::foundation::error::FramecraftError;

/// Easing functions used to map normalized animation progress.
///
/// Names parse in several spellings: `quadOut`, `OutQuad`, `out_quad` and `ease-out-quad` all
/// select [`Ease::OutQuad`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Ease {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in/out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in/out.
    InOutCubic,
    /// Sinusoidal ease-in.
    InSine,
    /// Sinusoidal ease-out.
    OutSine,
    /// Sinusoidal ease-in/out.
    InOutSine,
    /// Overshooting ease-out.
    OutBack,
}

const BACK_C1: f64 = 1.70158;
const BACK_C3: f64 = BACK_C1 + 1.0;

impl Ease {
    /// Every easing, in declaration order.
    pub const ALL: [Ease; 11] = [
        Self::Linear,
        Self::InQuad,
        Self::OutQuad,
        Self::InOutQuad,
        Self::InCubic,
        Self::OutCubic,
        Self::InOutCubic,
        Self::InSine,
        Self::OutSine,
        Self::InOutSine,
        Self::OutBack,
    ];

    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::InSine => 1.0 - (t * std::f64::consts::FRAC_PI_2).cos(),
            Self::OutSine => (t * std::f64::consts::FRAC_PI_2).sin(),
            Self::InOutSine => -((std::f64::consts::PI * t).cos() - 1.0) / 2.0,
            Self::OutBack => 1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2),
        }
    }

    /// Encoder expression computing this easing of the (already clamped) progress expression `p`.
    pub(crate) fn expr(self, p: &str) -> String {
        match self {
            Self::Linear => p.to_owned(),
            Self::InQuad => format!("({p})*({p})"),
            Self::OutQuad => format!("(1-(1-({p}))*(1-({p})))"),
            Self::InOutQuad => format!("if(lt({p},0.5),2*({p})*({p}),1-pow(-2*({p})+2,2)/2)"),
            Self::InCubic => format!("pow({p},3)"),
            Self::OutCubic => format!("(1-pow(1-({p}),3))"),
            Self::InOutCubic => format!("if(lt({p},0.5),4*pow({p},3),1-pow(-2*({p})+2,3)/2)"),
            Self::InSine => format!("(1-cos(({p})*PI/2))"),
            Self::OutSine => format!("sin(({p})*PI/2)"),
            Self::InOutSine => format!("(-(cos(PI*({p}))-1)/2)"),
            Self::OutBack => format!("(1+{BACK_C3}*pow(({p})-1,3)+{BACK_C1}*pow(({p})-1,2))"),
        }
    }

    /// Canonical camelCase name (`quadOut`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::InQuad => "quadIn",
            Self::OutQuad => "quadOut",
            Self::InOutQuad => "quadInOut",
            Self::InCubic => "cubicIn",
            Self::OutCubic => "cubicOut",
            Self::InOutCubic => "cubicInOut",
            Self::InSine => "sineIn",
            Self::OutSine => "sineOut",
            Self::InOutSine => "sineInOut",
            Self::OutBack => "backOut",
        }
    }
}

impl FromStr for Ease {
    type Err = FramecraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let key = key.strip_prefix("ease").unwrap_or(&key);
        let ease = match key {
            "linear" | "" => Self::Linear,
            "quadin" | "inquad" => Self::InQuad,
            "quadout" | "outquad" => Self::OutQuad,
            "quadinout" | "inoutquad" => Self::InOutQuad,
            "cubicin" | "incubic" => Self::InCubic,
            "cubicout" | "outcubic" => Self::OutCubic,
            "cubicinout" | "inoutcubic" => Self::InOutCubic,
            "sinein" | "insine" => Self::InSine,
            "sineout" | "outsine" => Self::OutSine,
            "sineinout" | "inoutsine" => Self::InOutSine,
            "backout" | "outback" => Self::OutBack,
            _ => {
                return Err(FramecraftError::config(format!(
                    "unknown easing '{}'",
                    s.trim()
                )));
            }
        };
        Ok(ease)
    }
}

impl serde::Serialize for Ease {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Ease {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
