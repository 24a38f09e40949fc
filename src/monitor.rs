//! Rolling-window power monitor with threshold alerts.

use std::collections::VecDeque;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use tracing::debug;

use crate::config::MonitorConfig;
use crate::sim::types::Snapshot;

/// Power channels tracked by the [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Solar,
    Wind,
    Load,
    Battery,
    Grid,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Solar,
        Channel::Wind,
        Channel::Load,
        Channel::Battery,
        Channel::Grid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Solar => "solar",
            Channel::Wind => "wind",
            Channel::Load => "load",
            Channel::Battery => "battery",
            Channel::Grid => "grid",
        }
    }

    /// Reading of this channel in `s`, in kW.
    pub fn value(self, s: &Snapshot) -> f64 {
        match self {
            Channel::Solar => s.solar_kw,
            Channel::Wind => s.wind_kw,
            Channel::Load => s.load_kw,
            Channel::Battery => s.battery_kw,
            Channel::Grid => s.grid_kw,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Info => f.pad("info"),
            AlertLevel::Warning => f.pad("warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub timestamp: NaiveDateTime,
    pub step: usize,
    pub level: AlertLevel,
    pub message: String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<7} {}",
            self.timestamp.format("%m-%d %H:%M"),
            self.level,
            self.message
        )
    }
}

/// Summary of one channel over the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub current: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl ChannelStats {
    fn from_values(values: impl Iterator<Item = f64> + Clone) -> Option<Self> {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        let mut current = 0.0;
        for v in values.clone() {
            n += 1;
            sum += v;
            max = max.max(v);
            min = min.min(v);
            current = v;
        }
        if n == 0 {
            return None;
        }
        let mean = sum / n as f64;
        let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        Some(Self {
            current,
            mean,
            max,
            min,
            std: var.sqrt(),
        })
    }
}

/// Per-channel statistics, in [`Channel::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatistics {
    pub samples: usize,
    pub channels: Vec<(Channel, ChannelStats)>,
}

impl MonitorStatistics {
    pub fn get(&self, channel: Channel) -> Option<&ChannelStats> {
        self.channels
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, s)| s)
    }
}

impl fmt::Display for MonitorStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Monitor (last {} steps) ---", self.samples)?;
        write!(
            f,
            "{:<8} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "kW", "current", "mean", "min", "max", "std"
        )?;
        for (c, s) in &self.channels {
            write!(
                f,
                "\n{c:<8} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                s.current,
                s.mean,
                s.min,
                s.max,
                s.std
            )?;
        }
        Ok(())
    }
}

/// Live view over the most recent steps.
///
/// Keeps the last `window_size` readings of every [`Channel`] and raises
/// alerts on low or high SOC and on heavy demand. Alerts expire after
/// `alert_retention_minutes` of simulated time.
#[derive(Debug, Clone)]
pub struct Monitor {
    config: MonitorConfig,
    window: VecDeque<[f64; 5]>,
    alerts: VecDeque<Alert>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        let window = VecDeque::with_capacity(config.window_size.min(4096));
        Self {
            config,
            window,
            alerts: VecDeque::new(),
        }
    }

    /// Records `snapshot` and returns how many alerts it raised.
    pub fn update(&mut self, snapshot: &Snapshot) -> usize {
        if self.window.len() >= self.config.window_size.max(1) {
            self.window.pop_front();
        }
        self.window.push_back(Channel::ALL.map(|c| c.value(snapshot)));

        let raised = self.check_alerts(snapshot);
        self.expire(snapshot.timestamp);
        raised
    }

    fn check_alerts(&mut self, s: &Snapshot) -> usize {
        let mut raised = 0;
        let soc_alert = if s.soc < self.config.soc_low {
            Some((AlertLevel::Warning, format!("battery low: {:.1}%", 100.0 * s.soc)))
        } else if s.soc > self.config.soc_high {
            Some((AlertLevel::Info, format!("battery nearly full: {:.1}%", 100.0 * s.soc)))
        } else {
            None
        };
        if let Some((level, message)) = soc_alert {
            self.raise(s, level, message);
            raised += 1;
        }
        if s.load_kw > self.config.high_load_kw {
            self.raise(s, AlertLevel::Warning, format!("high load: {:.1} kW", s.load_kw));
            raised += 1;
        }
        raised
    }

    fn raise(&mut self, s: &Snapshot, level: AlertLevel, message: String) {
        debug!(step = s.step, %level, %message, "monitor alert");
        self.alerts.push_back(Alert {
            timestamp: s.timestamp,
            step: s.step,
            level,
            message,
        });
    }

    fn expire(&mut self, now: NaiveDateTime) {
        let retention = TimeDelta::minutes(i64::from(self.config.alert_retention_minutes));
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return;
        };
        while self.alerts.front().is_some_and(|a| a.timestamp <= cutoff) {
            self.alerts.pop_front();
        }
    }

    /// Number of steps currently in the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window statistics; `None` before the first update.
    pub fn statistics(&self) -> Option<MonitorStatistics> {
        let channels = Channel::ALL
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                ChannelStats::from_values(self.window.iter().map(move |row| row[i]))
                    .map(|s| (c, s))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(MonitorStatistics {
            samples: self.window.len(),
            channels,
        })
    }

    /// All retained alerts, oldest first.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    /// The `limit` most recent alerts, oldest first.
    pub fn recent_alerts(&self, limit: usize) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().skip(self.alerts.len().saturating_sub(limit))
    }

    /// Forgets every reading and alert.
    pub fn clear(&mut self) {
        self.window.clear();
        self.alerts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::PricePeriod;
    use chrono::NaiveDate;

    fn at(step: usize, minutes: i64) -> Snapshot {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        Snapshot {
            step,
            timestamp: start + TimeDelta::minutes(minutes),
            dt_hours: 1.0 / 60.0,
            irradiance: 0.0,
            ambient_temperature: 20.0,
            wind_speed: 0.0,
            cloud_cover: 0.0,
            solar_kw: 0.0,
            wind_kw: 0.0,
            diesel_kw: 0.0,
            load_kw: 50.0,
            served_load_kw: 50.0,
            battery_kw: 0.0,
            soc: 0.5,
            grid_kw: 50.0,
            unmet_load_kw: 0.0,
            curtailed_kw: 0.0,
            buy_price: 0.8,
            sell_price: 0.56,
            period: PricePeriod::Normal,
            fuel_l: 0.0,
            fuel_cost: 0.0,
            step_cost: 0.0,
            renewable_used_kw: 0.0,
            renewable_ratio: 0.0,
            diesel_on: false,
            battery_command: 0.0,
            reward: 0.0,
        }
    }

    fn monitor(window_size: usize) -> Monitor {
        Monitor::new(MonitorConfig {
            window_size,
            ..MonitorConfig::default()
        })
    }

    #[test]
    fn empty_monitor_has_no_statistics() {
        let m = monitor(3);
        assert!(m.is_empty());
        assert!(m.statistics().is_none());
    }

    #[test]
    fn window_keeps_most_recent_readings() {
        let mut m = monitor(3);
        for (i, load) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            let mut s = at(i, i as i64);
            s.load_kw = load;
            m.update(&s);
        }
        assert_eq!(m.len(), 3);
        let stats = m.statistics().unwrap();
        let load = stats.get(Channel::Load).unwrap();
        assert_eq!(load.current, 40.0);
        assert_eq!(load.min, 20.0);
        assert_eq!(load.max, 40.0);
        assert!((load.mean - 30.0).abs() < 1e-12);
        // population std of 20, 30, 40
        assert!((load.std - (200.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn statistics_follow_channel_order() {
        let mut m = monitor(5);
        let mut s = at(0, 0);
        s.battery_kw = -12.0;
        m.update(&s);
        let stats = m.statistics().unwrap();
        let order: Vec<Channel> = stats.channels.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, Channel::ALL.to_vec());
        assert_eq!(stats.get(Channel::Battery).unwrap().current, -12.0);
        assert_eq!(stats.get(Channel::Grid).unwrap().std, 0.0);
    }

    #[test]
    fn soc_and_load_alerts() {
        let mut m = monitor(5);

        let mut low = at(0, 0);
        low.soc = 0.1;
        low.load_kw = 150.0;
        assert_eq!(m.update(&low), 2);

        let mut high = at(1, 1);
        high.soc = 0.95;
        assert_eq!(m.update(&high), 1);

        assert_eq!(m.update(&at(2, 2)), 0);

        let levels: Vec<AlertLevel> = m.alerts().map(|a| a.level).collect();
        assert_eq!(
            levels,
            vec![AlertLevel::Warning, AlertLevel::Warning, AlertLevel::Info]
        );
        assert!(m.alerts().any(|a| a.message.contains("high load")));
    }

    #[test]
    fn thresholds_are_strict() {
        let mut m = monitor(5);
        let mut s = at(0, 0);
        s.soc = 0.15;
        s.load_kw = 140.0;
        assert_eq!(m.update(&s), 0);
        s.soc = 0.9;
        assert_eq!(m.update(&s), 0);
    }

    #[test]
    fn alerts_expire_in_simulated_time() {
        let mut m = monitor(5);
        let mut s = at(0, 0);
        s.soc = 0.05;
        m.update(&s);
        assert_eq!(m.alerts().count(), 1);

        m.update(&at(1, 29));
        assert_eq!(m.alerts().count(), 1);
        m.update(&at(2, 30));
        assert_eq!(m.alerts().count(), 0);
    }

    #[test]
    fn recent_alerts_takes_the_tail() {
        let mut m = monitor(5);
        for i in 0..4 {
            let mut s = at(i, i as i64);
            s.soc = 0.05;
            m.update(&s);
        }
        let steps: Vec<usize> = m.recent_alerts(2).map(|a| a.step).collect();
        assert_eq!(steps, vec![2, 3]);
        assert_eq!(m.recent_alerts(10).count(), 4);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut m = monitor(5);
        let mut s = at(0, 0);
        s.soc = 0.05;
        m.update(&s);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.alerts().count(), 0);
    }

    #[test]
    fn report_lists_every_channel() {
        let mut m = monitor(5);
        m.update(&at(0, 0));
        let text = m.statistics().unwrap().to_string();
        assert!(text.starts_with("--- Monitor (last 1 steps) ---"));
        for c in Channel::ALL {
            assert!(text.contains(c.name()));
        }
    }
}
