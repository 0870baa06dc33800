use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineStats {
    pub hits: usize,
    pub total: Duration,
    pub source: String,
}

/// ## Line profiler
///
/// Hit counts and accumulated time per one-based program line.

#[derive(Debug, Default)]
pub struct Profiler {
    enabled: bool,
    lines: HashMap<usize, LineStats>,
}

impl Profiler {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn reset(&mut self) {
        self.lines.clear();
    }

    pub fn record(&mut self, line: usize, source: &str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let stats = self.lines.entry(line).or_insert_with(|| LineStats {
            source: source.chars().take(60).collect(),
            ..LineStats::default()
        });
        stats.hits += 1;
        stats.total += elapsed;
    }

    pub fn stats(&self, line: usize) -> Option<&LineStats> {
        self.lines.get(&line)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The `top` most expensive lines, slowest first.
    pub fn report(&self, top: usize) -> String {
        if self.lines.is_empty() {
            return "No profiling data collected.".to_string();
        }
        let mut rows: Vec<(&usize, &LineStats)> = self.lines.iter().collect();
        rows.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.0.cmp(b.0)));
        let total: Duration = rows.iter().map(|(_, s)| s.total).sum();
        let hits: usize = rows.iter().map(|(_, s)| s.hits).sum();
        let rule = "-".repeat(72);
        let mut out = vec![
            "PROFILER REPORT".to_string(),
            format!(
                "Total time: {:.4}s  |  Total line executions: {}",
                total.as_secs_f64(),
                hits
            ),
            String::new(),
            format!(
                "{:>5}  {:>6}  {:>10}  {:>9}  {:>5}  Source",
                "Line", "Hits", "Total(ms)", "Avg(ms)", "%"
            ),
            rule.clone(),
        ];
        for (line, stats) in rows.into_iter().take(top) {
            let total_ms = stats.total.as_secs_f64() * 1000.0;
            let avg_ms = if stats.hits > 0 {
                total_ms / stats.hits as f64
            } else {
                0.0
            };
            let pct = if total.as_secs_f64() > 0.0 {
                stats.total.as_secs_f64() / total.as_secs_f64() * 100.0
            } else {
                0.0
            };
            out.push(format!(
                "{:>5}  {:>6}  {:>10.2}  {:>9.3}  {:>5.1}  {}",
                line, stats.hits, total_ms, avg_ms, pct, stats.source
            ));
        }
        out.push(rule);
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_records_nothing() {
        let mut p = Profiler::default();
        p.record(1, "PRINT 1", Duration::from_millis(1));
        assert!(p.is_empty());
        assert_eq!(p.report(10), "No profiling data collected.");
    }

    #[test]
    fn test_report_sorted_by_time() {
        let mut p = Profiler::default();
        p.set_enabled(true);
        p.record(1, "FAST", Duration::from_millis(1));
        p.record(2, "SLOW", Duration::from_millis(5));
        p.record(2, "SLOW", Duration::from_millis(5));
        assert_eq!(p.stats(2).unwrap().hits, 2);
        let report = p.report(10);
        let slow = report.find("SLOW").unwrap();
        let fast = report.find("FAST").unwrap();
        assert!(slow < fast);
        assert!(report.contains("Total line executions: 3"));
    }
}
