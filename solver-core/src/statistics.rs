//! Per-iteration statistics, printed as a bordered table and optionally
//! serialized as JSON keyed by iteration index.
//!
//! Components register their columns once (with a user-configurable order)
//! and push values as they become available during the iteration. Missing
//! values print as "-".

use std::collections::{BTreeMap, HashMap};

/// Width of integer columns.
pub const INT_WIDTH: usize = 7;
/// Width of floating-point columns.
pub const DOUBLE_WIDTH: usize = 17;

/// Tabular iteration statistics.
pub struct Statistics {
    /// order -> column name
    columns: BTreeMap<i32, String>,
    widths: HashMap<String, usize>,
    current_line: HashMap<String, String>,
    /// (iteration index, line) history for serialization
    history: Vec<(usize, HashMap<String, String>)>,
    iteration: usize,
    print_header_every_iterations: usize,
}

impl Statistics {
    pub fn new(print_header_every_iterations: usize) -> Self {
        Self {
            columns: BTreeMap::new(),
            widths: HashMap::new(),
            current_line: HashMap::new(),
            history: Vec::new(),
            iteration: 0,
            print_header_every_iterations,
        }
    }

    /// Register a column at the given order. Re-registering is a no-op.
    pub fn add_column(&mut self, name: &str, width: usize, order: i32) {
        if !self.widths.contains_key(name) {
            self.columns.insert(order, name.to_string());
            self.widths.insert(name.to_string(), width);
        }
    }

    pub fn set(&mut self, name: &str, value: impl StatisticValue) {
        self.current_line.insert(name.to_string(), value.render());
    }

    /// Start a fresh line for the next iteration.
    pub fn new_line(&mut self) {
        self.current_line.clear();
    }

    /// Commit the current line to the history.
    pub fn add_iteration(&mut self) {
        let index = self.history.len();
        self.history.push((index, self.current_line.clone()));
    }

    fn print_rule(&self, left: &str, mid: &str, right: &str) {
        let mut line = String::from(left);
        for (k, name) in self.columns.values().enumerate() {
            if k > 0 {
                line.push_str(mid);
            }
            line.push_str(&"─".repeat(self.widths[name]));
        }
        line.push_str(right);
        println!("{line}");
    }

    fn print_cells(&self, contents: impl Fn(&str) -> String) {
        let mut line = String::from("│");
        for (k, name) in self.columns.values().enumerate() {
            if k > 0 {
                line.push('│');
            }
            let value = contents(name);
            let width = self.widths[name];
            line.push(' ');
            line.push_str(&value);
            let used = 1 + value.chars().count();
            if used < width {
                line.push_str(&" ".repeat(width - used));
            }
        }
        line.push('│');
        println!("{line}");
    }

    fn print_header(&self, first_occurrence: bool) {
        if first_occurrence {
            self.print_rule("┌", "┬", "┐");
        } else {
            self.print_rule("├", "┼", "┤");
        }
        self.print_cells(|name| name.to_string());
    }

    /// Print the committed line, re-printing the header periodically.
    pub fn print_current_line(&mut self) {
        if self.iteration % self.print_header_every_iterations == 0 {
            self.print_header(self.iteration == 0);
        }
        self.print_rule("├", "┼", "┤");
        self.print_cells(|name| {
            self.current_line
                .get(name)
                .cloned()
                .unwrap_or_else(|| "-".to_string())
        });
        self.iteration += 1;
    }

    pub fn print_footer(&self) {
        self.print_rule("└", "┴", "┘");
    }

    /// Serialize the history as a JSON object keyed by iteration index.
    pub fn to_json(&self) -> String {
        let mut out = String::from("{\n");
        for (k, (iteration, line)) in self.history.iter().enumerate() {
            if k > 0 {
                out.push_str(",\n");
            }
            out.push_str(&format!("    \"{iteration}\": {{\n"));
            for (c, name) in self.columns.values().enumerate() {
                if c > 0 {
                    out.push_str(",\n");
                }
                let value = line.get(name).cloned().unwrap_or_else(|| "-".to_string());
                out.push_str(&format!("        \"{name}\": \"{value}\""));
            }
            out.push_str("\n    }");
        }
        out.push_str("\n}");
        out
    }
}

/// Values renderable into a statistics cell.
pub trait StatisticValue {
    fn render(&self) -> String;
}

impl StatisticValue for usize {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl StatisticValue for f64 {
    fn render(&self) -> String {
        format!("{:.7e}", self)
    }
}

impl StatisticValue for &str {
    fn render(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_ordered_and_deduplicated() {
        let mut statistics = Statistics::new(10);
        statistics.add_column("objective", DOUBLE_WIDTH, 2);
        statistics.add_column("iters", INT_WIDTH, 1);
        statistics.add_column("iters", INT_WIDTH, 5); // no-op
        let names: Vec<&String> = statistics.columns.values().collect();
        assert_eq!(names, vec!["iters", "objective"]);
    }

    #[test]
    fn test_json_serialization() {
        let mut statistics = Statistics::new(10);
        statistics.add_column("iters", INT_WIDTH, 1);
        statistics.add_column("objective", DOUBLE_WIDTH, 2);
        statistics.new_line();
        statistics.set("iters", 1usize);
        statistics.set("objective", 2.5f64);
        statistics.add_iteration();
        let json = statistics.to_json();
        assert!(json.contains("\"iters\": \"1\""));
        assert!(json.contains("\"objective\""));
        // missing values serialize as "-"
        statistics.new_line();
        statistics.set("iters", 2usize);
        statistics.add_iteration();
        assert!(statistics.to_json().contains("\"objective\": \"-\""));
    }
}
