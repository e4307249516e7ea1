use serde::Serialize;

use crate::{models::FacetStats, services::facets::RangeBounds};

const DEFAULT_MIN: f64 = 0.0;
const DEFAULT_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSide {
    From,
    To,
}

/// What a client needs to draw a range facet
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RangeFacetView {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub slider: (f64, f64),
    pub inputs: (String, String),
}

/// A numeric range facet with a two-thumb slider and two text inputs.
///
/// The slider always holds a committed, in-bounds pair; the inputs hold whatever the
/// user typed until the next commit or engine sync overwrites them.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFacet {
    min: f64,
    max: f64,
    is_integer: bool,
    slider: (f64, f64),
    inputs: (String, String),
}

impl RangeFacet {
    /// `is_integer` overrides the inference from the observed bounds
    pub fn new(stats: &FacetStats, is_integer: Option<bool>) -> Self {
        let min = stats.min.filter(|v| v.is_finite()).unwrap_or(DEFAULT_MIN);
        let max = stats.max.filter(|v| v.is_finite()).unwrap_or(DEFAULT_MAX);
        let (min, max) = if min <= max { (min, max) } else { (max, min) };

        let inferred = matches!(
            (stats.min, stats.max),
            (Some(lo), Some(hi)) if lo.fract() == 0.0 && hi.fract() == 0.0
        );

        let mut facet = Self {
            min,
            max,
            is_integer: is_integer.unwrap_or(inferred),
            slider: (min, max),
            inputs: (String::new(), String::new()),
        };
        facet.sync_inputs();
        facet
    }

    pub fn is_integer(&self) -> bool {
        self.is_integer
    }

    pub fn step(&self) -> f64 {
        if self.is_integer {
            1.0
        } else {
            0.1
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn slider(&self) -> (f64, f64) {
        self.slider
    }

    /// Input texts as displayed, leading zeros stripped
    pub fn inputs(&self) -> (String, String) {
        (
            strip_leading_zeros(&self.inputs.0),
            strip_leading_zeros(&self.inputs.1),
        )
    }

    pub fn view(&self) -> RangeFacetView {
        RangeFacetView {
            min: self.min,
            max: self.max,
            step: self.step(),
            slider: self.slider,
            inputs: self.inputs(),
        }
    }

    /// Applies the engine-reported refinement; open ends fall back to the observed bounds
    pub fn sync(&mut self, start: Option<RangeBounds>) {
        let start = start.unwrap_or_default();
        self.slider = (
            start.min.filter(|v| v.is_finite()).unwrap_or(self.min),
            start.max.filter(|v| v.is_finite()).unwrap_or(self.max),
        );
        self.sync_inputs();
    }

    /// Slider drag; commits immediately
    pub fn slide(&mut self, from: f64, to: f64) -> RangeBounds {
        self.commit(from, to)
    }

    pub fn edit_input(&mut self, side: RangeSide, text: impl Into<String>) {
        match side {
            RangeSide::From => self.inputs.0 = text.into(),
            RangeSide::To => self.inputs.1 = text.into(),
        }
    }

    /// Commits the typed inputs.
    ///
    /// Empty or non-numeric text falls back to the matching observed bound.
    pub fn submit(&mut self) -> RangeBounds {
        let from = parse_input(&self.inputs.0).unwrap_or(self.min);
        let to = parse_input(&self.inputs.1).unwrap_or(self.max);
        self.commit(from, to)
    }

    fn commit(&mut self, from: f64, to: f64) -> RangeBounds {
        let clamp = |value: f64| {
            let value = if value.is_finite() { value } else { self.min };
            let value = value.clamp(self.min, self.max);
            if self.is_integer {
                value.round()
            } else {
                value
            }
        };
        let (from, to) = (clamp(from), clamp(to));
        let (from, to) = if from <= to { (from, to) } else { (to, from) };

        self.slider = (from, to);
        self.sync_inputs();

        RangeBounds {
            min: Some(from),
            max: Some(to),
        }
    }

    fn sync_inputs(&mut self) {
        self.inputs = (self.slider.0.to_string(), self.slider.1.to_string());
    }
}

fn parse_input(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `007` shows as `7`, `00.5` as `0.5`
fn strip_leading_zeros(text: &str) -> String {
    let rest = text.trim_start_matches('0');
    if rest.len() == text.len() {
        return text.to_string();
    }
    match rest.chars().next() {
        Some(c) if c.is_ascii_digit() => rest.to_string(),
        _ if text.len() - rest.len() == 1 => text.to_string(),
        _ => format!("0{}", rest),
    }
}
