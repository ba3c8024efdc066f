use crate::crop::RootParams;
use crate::soil_hydra::{LAYERS, LayerVec, RootedProfile, SoilColumn};

// Root depth grows linearly in GDD from the growth trigger to flowering, bounded to [min, max]
pub fn root_depth(gdd: f64, root: &RootParams, root_max: f64, flowering_gdd: f64) -> f64 {
    let span = flowering_gdd - root.growth_start_gdd;
    let mut depth = if span == 0.0 {
        if gdd >= flowering_gdd { root_max } else { root.min_depth }
    } else {
        (root_max - root.min_depth) * (gdd - root.growth_start_gdd) / span + root.min_depth
    };
    // max first so a minimum above the soil-limited maximum wins
    if depth > root_max {
        depth = root_max;
    }
    if depth < root.min_depth {
        depth = root.min_depth;
    }
    depth
}

// Share of uptake between normalized depths z_upper and z_lower (integral of the root density cubic)
pub fn root_distribution(z_lower: f64, z_upper: f64) -> f64 {
    2.0633 * (z_lower - z_upper) - 1.622 * (z_lower * z_lower - z_upper * z_upper)
        + 0.5587 * (z_lower.powi(3) - z_upper.powi(3))
}

/// Root-zone geometry and the available water it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RootZone {
    pub depth: f64,
    pub fraction: LayerVec,     // share of each layer occupied by roots
    pub distribution: LayerVec, // uptake weight per layer
    pub plant_water: f64,       // PAW over the root zone, in
    pub managed_water: f64,     // available water in the management zone, in
}

impl RootZone {
    pub fn new(min_depth: f64) -> Self {
        RootZone {
            depth: min_depth,
            fraction: LayerVec::zeros(),
            distribution: LayerVec::zeros(),
            plant_water: 0.0,
            managed_water: 0.0,
        }
    }

    pub fn needs_update(&self, root_max: f64) -> bool {
        self.depth < root_max || self.managed_water <= 0.0
    }

    pub fn update(&mut self, depth: f64, layer_depth: &LayerVec, profile: &RootedProfile, mgmt_depth: f64) {
        self.depth = depth;
        self.plant_water = 0.0;
        self.managed_water = 0.0;
        let mut remain = depth;
        let (mut top, mut bottom) = (0.0, 0.0);
        let (mut z_upper, mut z_lower) = (0.0, 0.0);
        for i in 0..LAYERS {
            let d = layer_depth[i];
            remain -= d;
            self.fraction[i] = if remain >= 0.0 {
                1.0
            } else if remain > -d {
                (d + remain) / d
            } else {
                0.0
            };
            remain = remain.max(0.0);

            top = bottom;
            bottom += d;
            if bottom <= mgmt_depth {
                self.managed_water += profile.managed_water[i] * self.fraction[i];
            }
            if top < mgmt_depth && mgmt_depth < bottom {
                let share = if depth < mgmt_depth {
                    self.fraction[i]
                } else {
                    (mgmt_depth - top) / d
                };
                self.managed_water += profile.managed_water[i] * share;
            }
            self.plant_water += profile.plant_water[i] * self.fraction[i];

            z_upper = z_lower;
            if depth > 0.0 {
                z_lower = (z_lower + d / depth).min(1.0);
            }
            self.distribution[i] = root_distribution(z_lower, z_upper);
        }
    }
}

/// Depletion below field capacity within the management zone (AWDPLN).
///
/// Stops at the layer holding the management depth; a zone ending exactly on a
/// layer bottom stops there.
pub fn management_depletion(theta: &LayerVec, soil: &SoilColumn, zone: &RootZone, mgmt_depth: f64) -> f64 {
    let mut total = 0.0;
    let (mut top, mut bottom) = (0.0, 0.0);
    for i in 0..LAYERS {
        let d = soil.depth[i];
        top = bottom;
        bottom += d;
        let deficit = (soil.field_capacity[i] - theta[i]) * d;
        if bottom <= mgmt_depth {
            total += deficit * zone.fraction[i];
            if mgmt_depth == bottom {
                return total;
            }
        }
        if top < mgmt_depth && mgmt_depth < bottom {
            let share = if zone.depth < mgmt_depth {
                zone.fraction[i]
            } else {
                (mgmt_depth - top) / d
            };
            return total + deficit * share;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::soil;
    use approx::assert_relative_eq;

    fn params() -> RootParams {
        RootParams {
            min_depth: 6.0,
            max_depth: 48.0,
            stress_threshold: 50.0,
            growth_start_gdd: 200.0,
            management_depth: 36.0,
        }
    }

    #[test]
    fn depth_grows_linearly_and_is_bounded() {
        let p = params();
        assert_relative_eq!(root_depth(0.0, &p, 48.0, 1400.0), 6.0);
        assert_relative_eq!(root_depth(800.0, &p, 48.0, 1400.0), 27.0);
        assert_relative_eq!(root_depth(3000.0, &p, 48.0, 1400.0), 48.0);
        // soil-limited maximum below the minimum keeps the minimum
        assert_relative_eq!(root_depth(3000.0, &p, 4.0, 1400.0), 6.0);
        // flowering at the growth trigger is a step
        assert_relative_eq!(root_depth(199.0, &p, 48.0, 200.0), 6.0);
        assert_relative_eq!(root_depth(200.0, &p, 48.0, 200.0), 48.0);
    }

    #[test]
    fn depth_is_monotone_in_gdd() {
        let p = params();
        let mut last = 0.0;
        for g in (0..3000).step_by(25) {
            let d = root_depth(g as f64, &p, 40.0, 1400.0);
            assert!(d >= last);
            assert!((6.0..=40.0).contains(&d));
            last = d;
        }
    }

    #[test]
    fn full_depth_distribution_sums_to_one() {
        let total = root_distribution(1.0, 0.0);
        assert_relative_eq!(total, 2.0633 - 1.622 + 0.5587, epsilon = 1e-12);
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fractions_match_root_depth() {
        let column = soil(621);
        let profile = column.rooted_profile(48.0);
        let mut zone = RootZone::new(6.0);
        zone.update(10.0, &column.depth, &profile, 36.0);
        assert_eq!(zone.fraction[0], 1.0);
        assert_eq!(zone.fraction[1], 1.0);
        assert_eq!(zone.fraction[2], 1.0);
        assert_relative_eq!(zone.fraction[3], 1.0 / 6.0, epsilon = 1e-12);
        assert_eq!(zone.fraction[4], 0.0);
        assert_relative_eq!(zone.fraction.dot(&column.depth), 10.0, epsilon = 1e-12);
        assert_relative_eq!(zone.distribution.sum(), 1.0, epsilon = 1e-9);
        // roots above the management depth: the management zone is the rooted part
        assert_relative_eq!(
            zone.managed_water,
            (0..LAYERS)
                .map(|i| profile.managed_water[i] * zone.fraction[i])
                .sum::<f64>(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn management_zone_cut_inside_layer() {
        let column = soil(621);
        let profile = column.rooted_profile(48.0);
        let mut zone = RootZone::new(6.0);
        zone.update(48.0, &column.depth, &profile, 36.0);
        // layers end at 2,4,9,15,21,30,42: 36 sits half way into layer 7
        let expected: f64 = (0..6).map(|i| profile.managed_water[i]).sum::<f64>() + 0.5 * profile.managed_water[6];
        assert_relative_eq!(zone.managed_water, expected, epsilon = 1e-12);
        assert!(zone.plant_water > 0.0);
    }

    #[test]
    fn depletion_stops_at_management_depth() {
        let column = soil(621);
        let profile = column.rooted_profile(48.0);
        let mut zone = RootZone::new(6.0);
        zone.update(48.0, &column.depth, &profile, 30.0);
        let theta = column.wilting_point;
        let expected: f64 = (0..6)
            .map(|i| (column.field_capacity[i] - theta[i]) * column.depth[i])
            .sum();
        assert_relative_eq!(management_depletion(&theta, &column, &zone, 30.0), expected, epsilon = 1e-12);
        let at_fc = column.field_capacity;
        assert_relative_eq!(management_depletion(&at_fc, &column, &zone, 30.0), 0.0);
    }
}
