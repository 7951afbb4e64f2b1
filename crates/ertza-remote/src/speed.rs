/// Observed tick bounds, widened by every sample and never narrowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickRange {
    bounds: Option<(i64, i64)>,
}

impl TickRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sample into the range.
    ///
    /// The first sample sets `min = ticks` and `max = ticks + init_range`.
    pub fn observe(&mut self, ticks: i64, init_range: i64) {
        self.bounds = Some(match self.bounds {
            None => (ticks, ticks + init_range),
            Some((min, max)) => (min.min(ticks), max.max(ticks)),
        });
    }

    pub fn min_ticks(&self) -> Option<i64> {
        self.bounds.map(|(min, _)| min)
    }

    pub fn max_ticks(&self) -> Option<i64> {
        self.bounds.map(|(_, max)| max)
    }
}

/// Maps encoder ticks to a speed across the observed tick range.
#[derive(Debug, Clone)]
pub struct SpeedMapper {
    range: TickRange,
    max_speed: f64,
    min_speed: f64,
    dead_zone: i64,
    init_range: i64,
}

impl SpeedMapper {
    pub fn new(max_speed: f64, min_speed: f64, dead_zone: i64, init_range: i64) -> Self {
        Self {
            range: TickRange::new(),
            max_speed,
            min_speed,
            dead_zone,
            init_range,
        }
    }

    /// Observe `ticks` and return the mapped speed.
    ///
    /// `rate = (min - ticks + dead_zone) / (min - max + dead_zone)`, scaled
    /// by `max_speed` and raised to at least `min_speed`. A degenerate range
    /// maps to `min_speed`.
    pub fn map(&mut self, ticks: i64) -> f64 {
        self.range.observe(ticks, self.init_range);
        let (Some(min), Some(max)) = (self.range.min_ticks(), self.range.max_ticks()) else {
            return self.min_speed;
        };

        let span = min - max + self.dead_zone;
        if span == 0 {
            return self.min_speed;
        }
        let rate = (min - ticks + self.dead_zone) as f64 / span as f64;
        let speed = self.max_speed * rate;
        if speed <= self.min_speed {
            self.min_speed
        } else {
            speed
        }
    }

    pub fn range(&self) -> &TickRange {
        &self.range
    }
}
