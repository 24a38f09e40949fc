//! Simulation core: the per-step energy balance state machine.

use chrono::Timelike;
use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::devices::{
    BatteryStorage, DieselGenerator, Generator, GridConnection, Load, SolarArray, WindTurbine,
};
use crate::environment::weather::hour_of_day;
use crate::environment::{TariffModel, WeatherModel};
use crate::error::{MicrogridError, Result};

use super::clock::SimulationClock;
use super::history::History;
use super::power_balance::{net_surplus_kw, settle};
use super::reward::{RewardInput, shaped_reward};
use super::state::{
    BatteryState, ComponentState, DieselState, GridState, SourceState, Statistics, StepTotals,
    SystemState,
};
use super::types::{
    Action, Conditions, IRRADIANCE_SCALE, OBSERVATION_LEN, Observation, PRICE_SCALE, SimPhase,
    Snapshot, StepOutcome, TEMPERATURE_SCALE, WIND_SPEED_SCALE,
};

/// Seed offset for the weather stream.
const WEATHER_SEED_OFFSET: u64 = 11;
/// Seed offset for the tariff noise stream.
const TARIFF_SEED_OFFSET: u64 = 23;
/// Seed offset for the demand noise stream.
const LOAD_SEED_OFFSET: u64 = 37;

/// Simulation core owning every component, the clock, accumulators and history.
///
/// One instance per episode runner. Instances share nothing, so several can run
/// on separate threads.
///
/// Conditions for the current timestamp are sampled ahead of time (at
/// construction, on reset and after each step), which keeps
/// [`get_state`](Self::get_state) and [`get_observation`](Self::get_observation)
/// free of side effects.
#[derive(Debug, Clone)]
pub struct MicrogridCore {
    config: ScenarioConfig,
    clock: SimulationClock,
    weather: WeatherModel,
    tariff: TariffModel,
    load: Load,
    solar: SolarArray,
    wind: WindTurbine,
    battery: BatteryStorage,
    diesel: DieselGenerator,
    grid: GridConnection,
    phase: SimPhase,
    stats: Statistics,
    history: History,
    pending: Conditions,
    last_grid_kw: f64,
}

impl MicrogridCore {
    /// Validates `config` and builds a core in the `Initialized` phase.
    ///
    /// # Errors
    ///
    /// Returns `MicrogridError::Configuration` listing every invalid field.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        config.ensure_valid()?;

        let seed = config.simulation.seed;
        let sim = &config.simulation;
        let clock = SimulationClock::new(sim.start_time, sim.step_minutes, sim.horizon_steps);
        let mut weather =
            WeatherModel::new(config.weather.clone(), seed.wrapping_add(WEATHER_SEED_OFFSET));
        let mut tariff =
            TariffModel::new(config.tariff.clone(), seed.wrapping_add(TARIFF_SEED_OFFSET));
        let mut load = Load::new(&config.load, seed.wrapping_add(LOAD_SEED_OFFSET));
        let solar = SolarArray::new(&config.solar);
        let wind = WindTurbine::new(&config.wind);
        let pending = sample_conditions(
            &clock,
            &mut weather,
            &mut tariff,
            &mut load,
            &solar,
            &wind,
        );

        info!(
            seed,
            horizon = sim.horizon_steps,
            step_minutes = sim.step_minutes,
            "microgrid core initialized"
        );

        Ok(Self {
            clock,
            weather,
            tariff,
            load,
            solar,
            wind,
            battery: BatteryStorage::new(&config.battery),
            diesel: DieselGenerator::new(&config.diesel),
            grid: GridConnection::new(&config.grid),
            phase: SimPhase::Initialized,
            stats: Statistics::default(),
            history: History::new(sim.history_capacity),
            pending,
            last_grid_kw: 0.0,
            config,
        })
    }

    /// Starts a new episode with the configured initial state and seed.
    ///
    /// Restores SOC, stops the diesel unit, rewinds the clock and every
    /// random stream, and clears accumulators and history. Specs are kept.
    pub fn reset(&mut self) -> Observation {
        self.clock.reset();
        self.weather.reset();
        self.tariff.reset();
        self.load.reset();
        self.battery.reset(self.config.battery.initial_soc);
        self.diesel.reset();
        self.stats = Statistics::default();
        self.history.clear();
        self.phase = SimPhase::Initialized;
        self.last_grid_kw = 0.0;
        self.pending = self.sample();
        info!(start = %self.clock.now(), "episode reset");
        self.get_observation()
    }

    /// Advances the simulation by one step.
    ///
    /// The action is validated before anything changes. Battery, diesel and
    /// grid requests beyond physical limits are clipped, and the clipped values
    /// are what get recorded and costed.
    ///
    /// # Errors
    ///
    /// - `EpisodeTerminated` if the horizon was already reached
    /// - `InvalidAction` if the battery command is NaN or infinite
    pub fn step(&mut self, action: Action) -> Result<StepOutcome> {
        if self.phase == SimPhase::Terminated {
            return Err(MicrogridError::EpisodeTerminated {
                steps: self.stats.steps,
            });
        }
        action.validate()?;
        let action = action.clamped();

        let c = self.pending;
        let dt = self.clock.dt_hours();
        self.phase = SimPhase::Running;

        // 1. Battery
        let setpoint_kw = if action.battery >= 0.0 {
            action.battery * self.battery.max_charge_kw
        } else {
            action.battery * self.battery.max_discharge_kw
        };
        let battery_kw = self.battery.dispatch(setpoint_kw, dt);
        let charge_kw = battery_kw.max(0.0);
        let discharge_kw = (-battery_kw).max(0.0);

        // 2. Diesel fills whatever the renewables and battery leave open
        self.diesel.set_running(action.diesel_on);
        let renewable_kw = c.solar_kw + c.wind_kw;
        let required_kw = (c.load_kw + charge_kw - renewable_kw - discharge_kw).max(0.0);
        let (diesel_kw, fuel_l) = self.diesel.output(required_kw, dt);

        // 3. Grid settles the residual
        let net_kw = net_surplus_kw(renewable_kw + diesel_kw, discharge_kw, c.load_kw, charge_kw);
        let settlement = settle(net_kw, &self.grid);
        let grid_kw = settlement.grid_kw;
        let served_kw = c.load_kw - settlement.unmet_kw;
        let curtailed_renewable_kw = settlement.curtailed_kw.min(renewable_kw);

        // 4. Cost
        let energy_cost = if grid_kw > 0.0 {
            grid_kw * c.price.buy_price * dt
        } else {
            grid_kw * c.price.sell_price * dt
        };
        let fuel_cost = self.diesel.fuel_cost(fuel_l);
        let step_cost = energy_cost + fuel_cost;

        // 5. Renewable share and accumulators
        let renewable_used_kw = (renewable_kw - curtailed_renewable_kw)
            .min(served_kw)
            .max(0.0);
        let renewable_ratio = if served_kw > 0.0 {
            (renewable_used_kw / served_kw).min(1.0)
        } else {
            0.0
        };
        self.stats.record(&StepTotals {
            cost: step_cost,
            renewable_kwh: renewable_used_kw * dt,
            consumed_kwh: served_kw * dt,
            demand_kwh: c.load_kw * dt,
            import_kwh: grid_kw.max(0.0) * dt,
            export_kwh: (-grid_kw).max(0.0) * dt,
            fuel_l,
            unmet_kwh: settlement.unmet_kw * dt,
            curtailed_kwh: settlement.curtailed_kw * dt,
        });
        self.last_grid_kw = grid_kw;

        let soc = self.battery.soc();
        let diesel_on = self.diesel.is_running();
        let reward = shaped_reward(
            &self.config.reward,
            &RewardInput {
                cost: step_cost,
                renewable_ratio,
                soc,
                grid_kw,
                diesel_on,
            },
        );

        if settlement.unmet_kw > 0.0 {
            warn!(
                step = self.clock.index(),
                unmet_kw = settlement.unmet_kw,
                "load shed: demand exceeds local supply and grid import"
            );
        }

        // 6. Record and advance
        let snapshot = Snapshot {
            step: self.clock.index(),
            timestamp: c.timestamp,
            dt_hours: dt,
            irradiance: c.weather.irradiance,
            ambient_temperature: c.weather.ambient_temperature,
            wind_speed: c.weather.wind_speed,
            cloud_cover: c.weather.cloud_cover,
            solar_kw: c.solar_kw,
            wind_kw: c.wind_kw,
            diesel_kw,
            load_kw: c.load_kw,
            served_load_kw: served_kw,
            battery_kw,
            soc,
            grid_kw,
            unmet_load_kw: settlement.unmet_kw,
            curtailed_kw: settlement.curtailed_kw,
            buy_price: c.price.buy_price,
            sell_price: c.price.sell_price,
            period: c.price.period,
            fuel_l,
            fuel_cost,
            step_cost,
            renewable_used_kw,
            renewable_ratio,
            diesel_on,
            battery_command: action.battery,
            reward,
        };
        self.history.push(snapshot.clone());

        debug!(
            step = snapshot.step,
            battery_kw,
            soc,
            grid_kw,
            diesel_kw,
            cost = step_cost,
            reward,
            "step"
        );

        self.clock.tick();
        let done = self.clock.is_finished();
        if done {
            self.phase = SimPhase::Terminated;
            info!(
                steps = self.stats.steps,
                total_cost = self.stats.total_cost,
                renewable_ratio = self.stats.renewable_ratio(),
                "episode complete"
            );
        }
        self.pending = self.sample();

        Ok(StepOutcome {
            observation: self.get_observation(),
            reward,
            done,
            info: snapshot,
        })
    }

    /// Normalized feature vector for the current timestamp.
    ///
    /// See [`Observation`] for the layout.
    pub fn get_observation(&self) -> Observation {
        let c = &self.pending;
        let hour = hour_of_day(c.timestamp);
        let peak = self.config.load.peak_kw;

        let mut v = [0.0; OBSERVATION_LEN];
        v[Observation::HOUR] = hour / 24.0;
        v[Observation::SOLAR] = self.solar.capacity_factor(c.solar_kw);
        v[Observation::WIND] = self.wind.capacity_factor(c.wind_kw);
        v[Observation::LOAD] = if peak > 0.0 { c.load_kw / peak } else { 0.0 };
        v[Observation::SOC] = self.battery.soc();
        v[Observation::PRICE] = c.price.buy_price / PRICE_SCALE;
        v[Observation::IRRADIANCE] = c.weather.irradiance / IRRADIANCE_SCALE;
        v[Observation::WIND_SPEED] = c.weather.wind_speed / WIND_SPEED_SCALE;
        v[Observation::TEMPERATURE] = c.weather.ambient_temperature / TEMPERATURE_SCALE;
        v[Observation::GRID_CONNECTED] = if self.grid.is_connected() { 1.0 } else { 0.0 };
        Observation(v)
    }

    /// Full snapshot of the current moment for rendering and reporting.
    pub fn get_state(&self) -> SystemState {
        let c = &self.pending;
        let b = &self.battery;
        SystemState {
            timestamp: c.timestamp,
            step: self.clock.index(),
            horizon: self.clock.horizon(),
            phase: self.phase,
            weather: c.weather,
            price: c.price,
            components: ComponentState {
                solar: SourceState {
                    output_kw: c.solar_kw,
                    capacity_kw: self.solar.capacity_kw(),
                },
                wind: SourceState {
                    output_kw: c.wind_kw,
                    capacity_kw: self.wind.capacity_kw(),
                },
                battery: BatteryState {
                    soc: b.soc(),
                    stored_kwh: b.stored_kwh(),
                    capacity_kwh: b.capacity_kwh,
                    soc_min: b.soc_min,
                    soc_max: b.soc_max,
                    max_charge_kw: b.max_charge_kw,
                    max_discharge_kw: b.max_discharge_kw,
                    cycle_count: b.cycle_count(),
                },
                diesel: DieselState {
                    enabled: self.diesel.enabled,
                    running: self.diesel.is_running(),
                    capacity_kw: self.diesel.capacity_kw,
                    run_hours: self.diesel.run_hours(),
                },
                grid: GridState {
                    connected: self.grid.is_connected(),
                    max_import_kw: self.grid.max_import_kw(),
                    max_export_kw: self.grid.max_export_kw(),
                    last_exchange_kw: self.last_grid_kw,
                },
                load_kw: c.load_kw,
            },
            statistics: self.stats.report(),
        }
    }

    /// Read-only history of completed steps, oldest first.
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Conditions that the next `step` will use.
    pub fn conditions(&self) -> &Conditions {
        &self.pending
    }

    pub fn battery(&self) -> &BatteryStorage {
        &self.battery
    }

    pub fn diesel(&self) -> &DieselGenerator {
        &self.diesel
    }

    pub fn grid(&self) -> &GridConnection {
        &self.grid
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    /// Steps taken in the current episode.
    pub fn step_count(&self) -> usize {
        self.clock.index()
    }

    pub fn is_done(&self) -> bool {
        self.phase == SimPhase::Terminated
    }

    pub fn dt_hours(&self) -> f64 {
        self.clock.dt_hours()
    }

    fn sample(&mut self) -> Conditions {
        sample_conditions(
            &self.clock,
            &mut self.weather,
            &mut self.tariff,
            &mut self.load,
            &self.solar,
            &self.wind,
        )
    }
}

fn sample_conditions(
    clock: &SimulationClock,
    weather: &mut WeatherModel,
    tariff: &mut TariffModel,
    load: &mut Load,
    solar: &SolarArray,
    wind: &WindTurbine,
) -> Conditions {
    let timestamp = clock.now();
    let env = weather.sample(timestamp);
    Conditions {
        timestamp,
        weather: env,
        price: tariff.price(timestamp),
        load_kw: load.demand_kw(timestamp.hour() as usize),
        solar_kw: solar.output_kw(&env),
        wind_kw: wind.output_kw(&env),
    }
}
