use approx::{assert_abs_diff_eq, assert_relative_eq};
use crop_balance::crop::CropId;
use crop_balance::drainage::{drain, infiltrate, redistribute};
use crop_balance::root_uptake::{MAX_UPTAKE_PASSES, layer_status, solve_uptake};
use crop_balance::root_zone::RootZone;
use crop_balance::snowmelt::Snowpack;
use crop_balance::soil_hydra::LAYERS;
use crop_balance::state::SoilMoistureState;
use crop_balance::{CarryOver, ReferenceTables, Scenario, SimError, SoilCatalog, run_scenario};

fn tables() -> ReferenceTables {
    ReferenceTables::from_toml_str(include_str!("data/reference_tables.toml")).unwrap()
}

fn soils() -> SoilCatalog {
    SoilCatalog::from_toml_str(include_str!("data/soils.toml")).unwrap()
}

fn corn() -> Scenario {
    Scenario::from_toml_str(include_str!("data/corn_dryland.toml")).unwrap()
}

#[test]
fn dry_land_grain_without_rain_loses_yield() {
    let mut s = corn();
    s.crop.crop = CropId::Soybeans;
    s.weather.precip.iter_mut().for_each(|p| *p = 0.0);
    let out = run_scenario(&s, &soils(), &tables()).unwrap();
    let summary = &out.summary;
    assert_eq!(summary.net_irrigation, 0.0);
    assert_eq!(summary.gross_irrigation, 0.0);
    assert_eq!(summary.irrigations, 0);
    assert_eq!(summary.first_irrigation_day, None);
    assert!(summary.et_max > 0.0);
    assert!(summary.yield_amount < s.crop.yield_model.max_yield);
    assert!(summary.yield_ratio < 1.0);
}

#[test]
fn saturated_profile_drains_to_field_capacity() {
    let t = tables();
    let column = soils().column(621, &t.layer_depths).unwrap();
    let mut theta = column.field_capacity;
    let wet_day = 150;
    infiltrate(&mut theta, &column, 6.0);
    let at_capacity = column.stored_water(&column.field_capacity);

    let mut last = column.stored_water(&theta);
    for day in wet_day..=wet_day + 5 {
        let pool = redistribute(&mut theta, &column);
        let drained = drain(day, wet_day, &pool, &mut theta, &column);
        let stored = column.stored_water(&theta);
        assert!(stored <= last + 1e-12);
        // the wetting day counts as the first drainage day
        if f64::from(day - wet_day + 1) >= column.drainage_days {
            assert_eq!(drained.fraction, 1.0);
            assert_abs_diff_eq!(stored, at_capacity, epsilon = 1e-9);
        } else {
            assert!(stored > at_capacity);
        }
        last = stored;
    }
}

#[test]
fn open_water_holds_profile_at_field_capacity() {
    let mut s = corn();
    s.crop.crop = CropId::DeepWater;
    s.crop.tillage.clear();
    s.options.report_interval = 1;
    let t = tables();
    let out = run_scenario(&s, &soils(), &t).unwrap();
    let column = soils().column(621, &t.layer_depths).unwrap();

    assert_eq!(out.summary.totals.all.evaporation, 0.0);
    assert_eq!(out.summary.totals.all.transpiration, 0.0);
    assert!(out.summary.totals.all.et > 0.0);
    assert_eq!(out.snapshots.len(), 365);
    for snap in &out.snapshots {
        for i in 0..LAYERS {
            assert_relative_eq!(snap.theta[i], column.field_capacity[i], epsilon = 1e-12);
        }
    }
}

#[test]
fn demand_equal_to_available_converges() {
    let t = tables();
    let column = soils().column(621, &t.layer_depths).unwrap();
    let profile = column.rooted_profile(48.0);
    let mut zone = RootZone::new(6.0);
    zone.update(40.0, &column.depth, &profile, 36.0);
    let mut theta = column.field_capacity;
    theta[1] = 0.5 * (column.field_capacity[1] + profile.wilting_point[1]);
    let status = layer_status(&theta, &column, &profile, &zone);
    let out = solve_uptake(200, status.available, &mut theta, &column, &profile, &zone, &status).unwrap();
    assert!(out.passes <= MAX_UPTAKE_PASSES);
    assert_relative_eq!(out.transpired, status.available, epsilon = 1e-3);
}

#[test]
fn snow_melts_into_effective_rain() {
    let snow = tables().snow;
    let mut pack = Snowpack::new(25.0, 0.0);
    // below the melt base all day: everything is stored
    let stored = pack.step(15, -5.0, -2.0, 0.6, &snow);
    assert_eq!(stored.rain, 0.0);
    let before = pack.water;
    assert_relative_eq!(before, 0.6);

    let warm = pack.step(16, 50.0, 62.0, 0.0, &snow);
    assert!(pack.water < before);
    assert!(warm.melt > 0.0 && warm.melt <= before);
    assert_relative_eq!(warm.rain, warm.melt);
}

#[test]
fn melted_snow_reaches_the_season_totals() {
    let mut s = corn();
    let w = &mut s.weather;
    w.precip.iter_mut().for_each(|p| *p = 0.0);
    for d in 0..20 {
        w.max_temp[d] = 25.0;
        w.min_temp[d] = 10.0;
    }
    w.precip[9] = 0.8;
    for d in 20..25 {
        w.max_temp[d] = 65.0;
        w.min_temp[d] = 45.0;
    }
    let out = run_scenario(&s, &soils(), &tables()).unwrap();
    let january = &out.accumulators.months[0];
    assert_relative_eq!(january.precip, 0.8);
    assert!(january.effective_precip > 0.0);
    assert!(january.effective_precip + january.runoff <= 0.8 + 1e-9);
}

#[test]
fn carry_over_hand_off_reproduces_available_water() {
    let s = corn();
    let t = tables();
    let out = run_scenario(&s, &soils(), &t).unwrap();
    let column = soils().column(621, &t.layer_depths).unwrap();
    let text = out.carry_over.to_toml_string().unwrap();
    let reloaded = CarryOver::from_toml_str(&text).unwrap();

    let mut a = SoilMoistureState::start(&out.carry_over, &column, CropId::Corn, 48.0, 6.0);
    let mut b = SoilMoistureState::start(&reloaded, &column, CropId::Corn, 48.0, 6.0);
    a.zone.update(30.0, &column.depth, &a.profile, 24.0);
    b.zone.update(30.0, &column.depth, &b.profile, 24.0);
    assert_eq!(a.zone.plant_water, b.zone.plant_water);
    assert_eq!(a.zone.managed_water, b.zone.managed_water);
    assert_eq!(a.theta, b.theta);
}

#[test]
fn daily_water_content_and_roots_stay_in_bounds() {
    let mut s = corn();
    s.options.report_interval = 1;
    let t = tables();
    let column = soils().column(621, &t.layer_depths).unwrap();
    let out = run_scenario(&s, &soils(), &t).unwrap();
    let saturation = column.saturation();
    let mut depth = 0.0;
    for snap in &out.snapshots {
        assert!(snap.theta.iter().all(|&v| (0.0..=saturation).contains(&v)), "day {}", snap.jday);
        assert!(snap.root_depth >= depth);
        assert!(snap.root_depth >= s.crop.root.min_depth);
        assert!(snap.root_depth <= s.crop.root.max_depth);
        depth = snap.root_depth;
    }
    assert!(out.summary.yield_amount > 0.0);
}

#[test]
fn failures_name_the_scenario() {
    let mut s = corn();
    s.soil = 999;
    let err = run_scenario(&s, &soils(), &tables()).unwrap_err();
    assert!(matches!(err.root(), SimError::MissingReferenceData(_)));
    assert!(err.to_string().contains("soil 999"));
}
