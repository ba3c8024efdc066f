use crate::soil_hydra::{LAYERS, LayerVec, SoilColumn};

// Weight of yesterday's layer temperature in today's value
const TEMP_LAG: f64 = 0.8;

// Snow water (in) at or below which the surface albedo is that of soil and cover
const SNOW_ALBEDO_LIMIT: f64 = 0.02;
const SNOW_ALBEDO: f64 = 0.8;

// Air and soil conditions for one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureForcing {
    pub max_temp: f64,
    pub min_temp: f64,
    pub solar: f64, // langleys
    pub annual_mean_temp: f64,
    pub stored_water: f64, // profile water, in
    pub residue: f64,      // lb/acre
    pub biomass: f64,      // above-ground biomass, lb/acre
    pub snow_water: f64,   // in
}

impl TemperatureForcing {
    pub fn mean_temp(&self) -> f64 {
        (self.max_temp + self.min_temp) / 2.0
    }
}

// Maximum damping depth from bulk density, scaled down for the profile's water content
pub fn damping_depth(bulk_density: f64, stored_water: f64, total_depth: f64) -> f64 {
    let max_depth = 39.4 + 98.4 * (bulk_density / (bulk_density + 686.0 * (-5.63 * bulk_density).exp()));
    let wc = stored_water / ((0.356 - 0.144 * bulk_density) * total_depth);
    let base = (1.0 - wc) / (1.0 + wc);
    max_depth * ((19.7 / max_depth).ln() * base * base).exp()
}

// Lag of the surface temperature behind the layer below, from residue/biomass cover and snow
pub fn cover_lag(cover: f64, snow_water: f64) -> f64 {
    let lag = 1.123 * cover / (1.123 * cover + (7.563 - 1.4566e-4 * cover).exp());
    let snow = if snow_water <= 4.724 {
        snow_water / (snow_water + (6.055 - 7.625 * snow_water).exp())
    } else {
        1.0
    };
    snow.max(lag)
}

pub fn surface_albedo(cover: f64, snow_water: f64, awhc_class: u8) -> f64 {
    if snow_water > SNOW_ALBEDO_LIMIT {
        return SNOW_ALBEDO;
    }
    let exposed = (-5.0e-5 * 1.123 * cover).exp();
    let soil_albedo = 0.30 - 0.10 * (f64::from(awhc_class) - 4.0) / 5.0;
    0.23 * (1.0 - exposed) + exposed * soil_albedo
}

/// Daily layer temperatures, damped toward the annual mean with depth.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilTemperature {
    pub layers: LayerVec, // F
}

impl SoilTemperature {
    pub fn new(layers: LayerVec) -> Self {
        SoilTemperature { layers }
    }

    // Surface temperature: bare-soil estimate, held back by cover toward the second layer
    pub fn surface(&self, forcing: &TemperatureForcing, awhc_class: u8) -> f64 {
        let cover = forcing.residue + forcing.biomass;
        let albedo = surface_albedo(cover, forcing.snow_water, awhc_class);
        let radiation = (4.1855e-2 * forcing.solar * (1.0 - albedo) - 14.0) / 20.0;
        let bare = forcing.mean_temp() + 0.5 * (forcing.max_temp - forcing.min_temp) * radiation;
        if forcing.residue > 0.01 || forcing.snow_water > 0.01 {
            let lag = cover_lag(cover, forcing.snow_water);
            bare.min(lag * self.layers[1] + (1.0 - lag) * bare)
        } else {
            bare
        }
    }

    pub fn update(&mut self, forcing: &TemperatureForcing, soil: &SoilColumn) {
        let surface = self.surface(forcing, soil.awhc_class);
        let dd = damping_depth(soil.bulk_density, forcing.stored_water, soil.total_depth());
        let centers = soil.centers();
        for k in 0..LAYERS {
            let zd = centers[k] / dd;
            let df = zd / (zd + (-0.8669 - 2.0775 * zd).exp());
            let target = df * (forcing.annual_mean_temp - surface) + surface;
            self.layers[k] = TEMP_LAG * self.layers[k] + (1.0 - TEMP_LAG) * target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::soil;
    use approx::assert_relative_eq;

    fn forcing() -> TemperatureForcing {
        TemperatureForcing {
            max_temp: 90.0,
            min_temp: 60.0,
            solar: 600.0,
            annual_mean_temp: 50.0,
            stored_water: 20.0,
            residue: 0.0,
            biomass: 0.0,
            snow_water: 0.0,
        }
    }

    #[test]
    fn drier_profile_damps_deeper() {
        let wet = damping_depth(1.4, 25.0, 78.0);
        let dry = damping_depth(1.4, 5.0, 78.0);
        assert!(dry > wet);
        assert!(wet > 0.0);
    }

    #[test]
    fn snow_raises_albedo_and_lag() {
        assert_eq!(surface_albedo(0.0, 1.0, 6), SNOW_ALBEDO);
        assert_relative_eq!(surface_albedo(0.0, 0.0, 4), 0.30);
        assert!(cover_lag(0.0, 2.0) > cover_lag(0.0, 0.0));
        assert_eq!(cover_lag(0.0, 5.0), 1.0);
    }

    #[test]
    fn layers_relax_toward_equilibrium() {
        let column = soil(621);
        let mut temps = SoilTemperature::new(LayerVec::repeat(50.0));
        let f = forcing();
        let surface = temps.surface(&f, column.awhc_class);
        assert!(surface > 50.0);
        temps.update(&f, &column);
        // warm day heats the top more than the bottom
        assert!(temps.layers[0] > temps.layers[9]);
        assert!(temps.layers[0] > 50.0 && temps.layers[0] < surface);
    }

    #[test]
    fn residue_cover_keeps_surface_cooler() {
        let temps = SoilTemperature::new(LayerVec::repeat(40.0));
        let bare = temps.surface(&forcing(), 6);
        let mut covered = forcing();
        covered.residue = 6000.0;
        assert!(temps.surface(&covered, 6) < bare);
    }
}
