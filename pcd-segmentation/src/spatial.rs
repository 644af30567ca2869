use std::collections::HashMap;

use nalgebra::Vector3;

type CellKey = (i64, i64, i64);

/// Uniform hash grid over a fixed set of positions for radius queries.
pub struct GridIndex<'a> {
    positions: &'a [Vector3<f64>],
    cell: f64,
    buckets: HashMap<CellKey, Vec<usize>>,
}

impl<'a> GridIndex<'a> {
    /// `cell` must be positive; queries with any radius are supported.
    pub fn build(positions: &'a [Vector3<f64>], cell: f64) -> Self {
        let mut buckets: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (i, p) in positions.iter().enumerate() {
            buckets.entry(Self::key(p, cell)).or_default().push(i);
        }
        GridIndex {
            positions,
            cell,
            buckets,
        }
    }

    fn key(p: &Vector3<f64>, cell: f64) -> CellKey {
        (
            (p.x / cell).floor() as i64,
            (p.y / cell).floor() as i64,
            (p.z / cell).floor() as i64,
        )
    }

    pub fn positions(&self) -> &'a [Vector3<f64>] {
        self.positions
    }

    /// Calls `f` with every index whose position lies within `radius` of
    /// `center` (inclusive), in a fixed order.
    pub fn for_each_within<F: FnMut(usize)>(&self, center: &Vector3<f64>, radius: f64, mut f: F) {
        let (cx, cy, cz) = Self::key(center, self.cell);
        let layers = (radius / self.cell).ceil() as i64;
        let r2 = radius * radius;
        for dx in -layers..=layers {
            for dy in -layers..=layers {
                for dz in -layers..=layers {
                    let Some(bucket) = self.buckets.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &j in bucket {
                        if (self.positions[j] - center).norm_squared() <= r2 {
                            f(j);
                        }
                    }
                }
            }
        }
    }

    pub fn within(&self, center: &Vector3<f64>, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        self.for_each_within(center, radius, |j| out.push(j));
        out
    }

    pub fn count_within(&self, center: &Vector3<f64>, radius: f64) -> usize {
        let mut count = 0;
        self.for_each_within(center, radius, |_| count += 1);
        count
    }
}
