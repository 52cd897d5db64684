//! Built-in numeric scaling preprocessors
//!
//! Both scalers fit their statistics on the frames they are given: a
//! single frame in per-item mode, the whole batch in batch mode. Numeric
//! columns come out as `Float64`; other columns pass through untouched.

use std::collections::HashMap;

use ml_warehouse_core::{Column, Error, Frame, MetaValue, Options, OptionsExt, Preprocessor, Result};

/// Running statistics of one numeric column (Welford)
#[derive(Debug, Clone, Copy)]
struct ColumnStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl ColumnStats {
    fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    #[allow(clippy::cast_precision_loss)]
    fn std_dev(&self, ddof: u64) -> f64 {
        if self.count <= ddof {
            return 0.0;
        }
        (self.m2 / (self.count - ddof) as f64).sqrt()
    }
}

fn fit(frames: &[Frame]) -> Result<HashMap<String, ColumnStats>> {
    let mut stats: HashMap<String, ColumnStats> = HashMap::new();
    for frame in frames {
        for column in frame.columns().iter().filter(|c| c.data_type().is_numeric()) {
            let entry = stats.entry(column.name().to_string()).or_insert_with(ColumnStats::new);
            for value in column.to_f64()?.into_iter().flatten().filter(|v| v.is_finite()) {
                entry.push(value);
            }
        }
    }
    Ok(stats)
}

fn rescale<F>(frame: &Frame, stats: &HashMap<String, ColumnStats>, scale: F) -> Result<Frame>
where
    F: Fn(f64, &ColumnStats) -> f64,
{
    let columns = frame
        .columns()
        .iter()
        .map(|column| match stats.get(column.name()) {
            Some(s) if column.data_type().is_numeric() => {
                let values = column.to_f64()?.into_iter().map(|v| v.map(|x| scale(x, s))).collect();
                Ok(Column::float64(column.name(), values))
            }
            _ => Ok(column.clone()),
        })
        .collect::<Result<Vec<_>>>()?;
    Frame::new(columns)
}

/// Z-score standardization of numeric columns
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    ddof: u64,
}

impl Standardizer {
    /// Create a standardizer with the given delta degrees of freedom
    pub fn new(ddof: u64) -> Self {
        Self { ddof }
    }

    /// Build from settings (`ddof`, default 0)
    pub fn from_settings(options: &Options) -> Result<Self> {
        let mut standardizer = Self::new(0);
        standardizer.update_settings(options)?;
        Ok(standardizer)
    }

    fn apply(&self, frame: &Frame, stats: &HashMap<String, ColumnStats>) -> Result<Frame> {
        rescale(frame, stats, |x, s| {
            let std = s.std_dev(self.ddof);
            if std > 0.0 {
                (x - s.mean) / std
            } else {
                0.0
            }
        })
    }
}

impl Preprocessor for Standardizer {
    fn preprocess(&mut self, frame: Frame) -> Result<Frame> {
        let stats = fit(std::slice::from_ref(&frame))?;
        self.apply(&frame, &stats)
    }

    fn preprocess_batch_ordered(&mut self, frames: Vec<Frame>) -> Result<Vec<Frame>> {
        let stats = fit(&frames)?;
        frames.iter().map(|frame| self.apply(frame, &stats)).collect()
    }

    fn update_settings(&mut self, options: &Options) -> Result<()> {
        if let Some(ddof) = options.get_u64("ddof")? {
            self.ddof = ddof;
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn settings(&self) -> Options {
        [("ddof".to_string(), MetaValue::Int(self.ddof as i64))].into_iter().collect()
    }
}

/// Linear rescaling of numeric columns into `[low, high]`
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    low: f64,
    high: f64,
}

impl MinMaxScaler {
    /// Create a scaler targeting `[low, high]`
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if low >= high {
            return Err(Error::InvalidInput(format!("min_max range [{low}, {high}] is empty")));
        }
        Ok(Self { low, high })
    }

    /// Build from settings (`low`, default 0.0; `high`, default 1.0)
    pub fn from_settings(options: &Options) -> Result<Self> {
        let mut scaler = Self::new(0.0, 1.0)?;
        scaler.update_settings(options)?;
        Ok(scaler)
    }

    fn apply(&self, frame: &Frame, stats: &HashMap<String, ColumnStats>) -> Result<Frame> {
        rescale(frame, stats, |x, s| {
            let range = s.max - s.min;
            if range > 0.0 {
                self.low + (x - s.min) / range * (self.high - self.low)
            } else {
                self.low
            }
        })
    }
}

impl Preprocessor for MinMaxScaler {
    fn preprocess(&mut self, frame: Frame) -> Result<Frame> {
        let stats = fit(std::slice::from_ref(&frame))?;
        self.apply(&frame, &stats)
    }

    fn preprocess_batch_ordered(&mut self, frames: Vec<Frame>) -> Result<Vec<Frame>> {
        let stats = fit(&frames)?;
        frames.iter().map(|frame| self.apply(frame, &stats)).collect()
    }

    fn update_settings(&mut self, options: &Options) -> Result<()> {
        let low = options.get_f64("low")?.unwrap_or(self.low);
        let high = options.get_f64("high")?.unwrap_or(self.high);
        *self = Self::new(low, high)?;
        Ok(())
    }

    fn settings(&self) -> Options {
        [
            ("low".to_string(), MetaValue::Float(self.low)),
            ("high".to_string(), MetaValue::Float(self.high)),
        ]
        .into_iter()
        .collect()
    }
}
