/// One level of detail: tessellate at `precision` when viewed from at least
/// `distance` away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailLevel {
    pub precision: f64,
    pub distance: f64,
}

impl DetailLevel {
    #[must_use]
    pub const fn new(precision: f64, distance: f64) -> Self {
        Self {
            precision,
            distance,
        }
    }
}

/// Whether detail levels are picked for committed geometry or for
/// short-lived previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelMode {
    #[default]
    Real,
    Temporary,
}

/// Settings shared by the mesh creators and the copy pools they hand out.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshCacheConfig {
    /// Upper bound on face and edge tessellations running at once per `create`.
    pub max_concurrency: usize,
    /// Target size of copy pools created through a session.
    pub pool_size: usize,
    /// Detail levels for solids, coarsest first.
    pub solid_levels: Vec<DetailLevel>,
    /// Detail levels for surfaces and curves.
    pub other_levels: Vec<DetailLevel>,
    /// Detail levels for solids meshed as temporary previews.
    pub temporary_levels: Vec<DetailLevel>,
}

impl Default for MeshCacheConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 64,
            pool_size: 4,
            solid_levels: vec![DetailLevel::new(0.05, 1000.0), DetailLevel::new(0.001, 1.0)],
            other_levels: vec![DetailLevel::new(0.0005, 1.0)],
            temporary_levels: vec![DetailLevel::new(0.003, 1.0)],
        }
    }
}

impl MeshCacheConfig {
    /// Sets the fan-out bound. Zero is raised to one.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn with_solid_levels(mut self, levels: Vec<DetailLevel>) -> Self {
        self.solid_levels = levels;
        self
    }

    #[must_use]
    pub fn with_other_levels(mut self, levels: Vec<DetailLevel>) -> Self {
        self.other_levels = levels;
        self
    }

    #[must_use]
    pub fn with_temporary_levels(mut self, levels: Vec<DetailLevel>) -> Self {
        self.temporary_levels = levels;
        self
    }

    /// The levels to mesh an item at. Non-solids use the other levels in
    /// either mode.
    #[must_use]
    pub fn levels_for(&self, solid: bool, mode: LevelMode) -> &[DetailLevel] {
        match (solid, mode) {
            (true, LevelMode::Real) => &self.solid_levels,
            (true, LevelMode::Temporary) => &self.temporary_levels,
            (false, _) => &self.other_levels,
        }
    }
}
