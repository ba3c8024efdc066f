use crate::soil_hydra::{LAYERS, LayerVec, SoilColumn};

/// Adds infiltrating water to the profile.
///
/// Layers are filled to field capacity from the top down; water left after
/// the last layer is spread evenly over the whole profile depth.
pub fn infiltrate(theta: &mut LayerVec, soil: &SoilColumn, water: f64) {
    let mut remain = water;
    for i in 0..LAYERS {
        if remain <= 0.0 {
            return;
        }
        let d = soil.depth[i];
        let room = (soil.field_capacity[i] - theta[i]) * d;
        if room <= 0.0 {
            continue;
        }
        let taken = room.min(remain);
        theta[i] += taken / d;
        remain -= taken;
    }
    if remain > 0.0 {
        let per_inch = remain / soil.total_depth();
        theta.add_scalar_mut(per_inch);
    }
}

// Water above field capacity pooled during redistribution
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Redistribution {
    pub extra: f64,       // in
    pub distributed: f64, // depth of layers at field capacity holding the pool, in
}

// Moves water above field capacity down into drier layers
pub fn redistribute(theta: &mut LayerVec, soil: &SoilColumn) -> Redistribution {
    let mut out = Redistribution::default();
    for i in 0..LAYERS {
        let d = soil.depth[i];
        let fc = soil.field_capacity[i];
        if theta[i] > fc {
            out.extra += (theta[i] - fc) * d;
            theta[i] = fc;
            out.distributed += d;
        } else if out.extra != 0.0 {
            let room = (fc - theta[i]) * d;
            if out.extra >= room {
                theta[i] = fc;
                out.extra -= room;
                out.distributed += d;
            } else {
                theta[i] += out.extra / d;
                out.extra = 0.0;
            }
        }
    }
    out
}

// Share of the pooled water leaving the profile, days counted from the last wetting
pub fn drained_fraction(days_since_wetting: f64, drainage_days: f64, coefficient: f64) -> f64 {
    if drainage_days <= 0.0 {
        return 1.0;
    }
    (days_since_wetting.max(0.0) / drainage_days).powf(coefficient).min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrainageDay {
    pub drained: f64,
    pub fraction: f64,
}

/**
Drains part of the pooled water and returns the rest to the wetted layers.

# Arguments
* `jday` - Day of year.
* `wetted_day` - Last day water entered the profile.
* `pool` - Result of today's redistribution.
* `theta` - Layer water contents, updated in place.
* `soil` - Soil column with the drainage constants.
*/
pub fn drain(jday: u32, wetted_day: u32, pool: &Redistribution, theta: &mut LayerVec, soil: &SoilColumn) -> DrainageDay {
    if pool.extra <= 0.0 {
        return DrainageDay::default();
    }
    let days = f64::from(jday) - f64::from(wetted_day) + 1.0;
    let fraction = drained_fraction(days, soil.drainage_days, soil.drainage_coefficient);
    let drained = pool.extra * fraction;
    if pool.distributed > 0.0 {
        let spread = (1.0 - fraction) * pool.extra / pool.distributed;
        for i in 0..LAYERS {
            if theta[i] >= soil.field_capacity[i] {
                theta[i] += spread;
            }
        }
    }
    DrainageDay { drained, fraction }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::soil;
    use approx::assert_relative_eq;

    #[test]
    fn infiltration_fills_from_the_top() {
        let column = soil(621);
        let mut theta = column.wilting_point;
        let room0 = (column.field_capacity[0] - theta[0]) * column.depth[0];
        infiltrate(&mut theta, &column, room0 + 0.01);
        assert_relative_eq!(theta[0], column.field_capacity[0]);
        assert_relative_eq!(theta[1], column.wilting_point[1] + 0.01 / column.depth[1], epsilon = 1e-12);
        assert_eq!(theta[2], column.wilting_point[2]);
    }

    #[test]
    fn surplus_spread_over_full_profile() {
        let column = soil(621);
        let mut theta = column.field_capacity;
        infiltrate(&mut theta, &column, 0.78);
        for i in 0..LAYERS {
            assert_relative_eq!(theta[i], column.field_capacity[i] + 0.01, epsilon = 1e-12);
        }
    }

    #[test]
    fn redistribution_conserves_water() {
        let column = soil(621);
        let mut theta = column.wilting_point;
        theta[0] = column.saturation();
        let before = column.stored_water(&theta);
        let pool = redistribute(&mut theta, &column);
        assert_relative_eq!(column.stored_water(&theta) + pool.extra, before, epsilon = 1e-12);
        assert_eq!(theta[0], column.field_capacity[0]);
        assert!(theta.iter().zip(column.field_capacity.iter()).all(|(t, fc)| t <= fc));
    }

    #[test]
    fn pooled_water_drains_by_power_law() {
        let column = soil(621);
        assert_relative_eq!(drained_fraction(1.0, 3.0, 0.5), (1.0f64 / 3.0).sqrt());
        assert_eq!(drained_fraction(3.0, 3.0, 0.5), 1.0);
        assert_eq!(drained_fraction(10.0, 3.0, 0.5), 1.0);

        let mut theta = column.field_capacity;
        let pool = Redistribution {
            extra: 0.6,
            distributed: column.total_depth(),
        };
        let day = drain(100, 100, &pool, &mut theta, &column);
        let fraction = (1.0f64 / 3.0).sqrt();
        assert_relative_eq!(day.drained, 0.6 * fraction);
        let kept = column.stored_water(&theta) - column.stored_water(&column.field_capacity);
        assert_relative_eq!(kept + day.drained, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn nothing_drains_without_a_pool() {
        let column = soil(621);
        let mut theta = column.field_capacity;
        let day = drain(100, 90, &Redistribution::default(), &mut theta, &column);
        assert_eq!(day, DrainageDay::default());
        assert_eq!(theta, column.field_capacity);
    }
}
