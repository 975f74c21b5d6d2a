//! Prompt rendering.
//!
//! Returns are fractions computed upstream; this module only formats them.

use std::fmt::Write as _;

use chrono::NaiveDate;

use pfk_analytics::{CrashAnalysis, PeriodAnalysisResult, RunStats};
use pfk_backtest::BacktestConfig;

/// Everything the prompt mentions.
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
    pub equity_weight: f64,
    pub fixed_income_weight: f64,
    pub cash_weight: f64,
    pub benchmark_name: &'a str,
    pub currency: &'a str,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub stats: &'a RunStats,
    pub analysis: &'a CrashAnalysis,
}

impl<'a> PromptInput<'a> {
    /// Group weight totals are summed from `config`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_run(
        config: &BacktestConfig,
        benchmark_name: &'a str,
        currency: &'a str,
        start: NaiveDate,
        end: NaiveDate,
        stats: &'a RunStats,
        analysis: &'a CrashAnalysis,
    ) -> Self {
        let sum = |assets: &[String]| -> f64 {
            assets
                .iter()
                .filter_map(|a| config.weights.asset(a))
                .sum()
        };
        Self {
            equity_weight: sum(&config.grouping.equity),
            fixed_income_weight: sum(&config.grouping.fixed_income),
            cash_weight: config.weights.cash(),
            benchmark_name,
            currency,
            start,
            end,
            stats,
            analysis,
        }
    }
}

/// `0.1234` -> `"12.34%"`; missing or non-finite -> `"n/a"`.
pub fn format_pct(x: Option<f64>) -> String {
    match x {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => "n/a".to_string(),
    }
}

/// Rounded to a whole unit with `,` thousands separators.
pub fn format_amount(x: f64) -> String {
    if !x.is_finite() {
        return "n/a".to_string();
    }
    let rounded = x.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn whole_pct(x: f64) -> String {
    format!("{:.0}%", x * 100.0)
}

fn component_line(r: &PeriodAnalysisResult) -> String {
    format!(
        "equity {}, fixed income {}, cash {}",
        format_pct(r.stock_return),
        format_pct(r.bond_return),
        format_pct(r.cash_return)
    )
}

/// Render the advisor prompt.
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let mut p = String::new();
    // Writing into a String cannot fail.
    let _ = write_prompt(&mut p, input);
    p
}

fn write_prompt(p: &mut String, input: &PromptInput<'_>) -> std::fmt::Result {
    let bm = input.benchmark_name;
    let cur = input.currency;
    let pf = &input.stats.portfolio;
    let bs = &input.stats.benchmark;
    let mdd = &input.analysis.mdd_period_analysis;
    let day = &input.analysis.worst_day_analysis;

    writeln!(
        p,
        "You are a professional asset-management advisor. Analyse the user's backtest \
         results below and give friendly advice in at most ten lines, with a blank line \
         between topics. Do not use ** for emphasis."
    )?;
    p.push('\n');

    writeln!(p, "[1. Portfolio composition]")?;
    writeln!(
        p,
        "- Equity {}, fixed income {}, cash {}",
        whole_pct(input.equity_weight),
        whole_pct(input.fixed_income_weight),
        whole_pct(input.cash_weight)
    )?;
    writeln!(p, "- Benchmark: {bm}")?;
    writeln!(p, "- Test period: {} ~ {}", input.start, input.end)?;
    p.push('\n');

    writeln!(p, "[2. Performance summary]")?;
    writeln!(p, "- Portfolio:")?;
    writeln!(p, "    - Final value: {} {cur}", format_amount(pf.final_value))?;
    writeln!(p, "    - CAGR: {}", format_pct(Some(pf.cagr)))?;
    writeln!(p, "    - MDD: {}", format_pct(Some(pf.mdd)))?;
    writeln!(p, "- {bm} (benchmark):")?;
    writeln!(p, "    - Final value: {} {cur}", format_amount(bs.final_value))?;
    writeln!(p, "    - CAGR: {}", format_pct(Some(bs.cagr)))?;
    writeln!(p, "    - MDD: {}", format_pct(Some(bs.mdd)))?;
    p.push('\n');

    writeln!(
        p,
        "[3. Worst {bm} period ({} ~ {})]",
        mdd.start_date, mdd.end_date
    )?;
    writeln!(
        p,
        "- {bm} returned {} over this period.",
        format_pct(mdd.benchmark_return)
    )?;
    writeln!(
        p,
        "- The portfolio returned {} over the same period.",
        format_pct(mdd.portfolio_return)
    )?;
    writeln!(p, "- Inside the portfolio: {}", component_line(mdd))?;
    p.push('\n');

    writeln!(p, "[4. Worst {bm} day ({})]", day.date)?;
    writeln!(
        p,
        "- {bm} moved {} in a single day.",
        format_pct(Some(day.benchmark_return))
    )?;
    writeln!(
        p,
        "- The portfolio moved {} on the same day.",
        format_pct(day.portfolio_return)
    )?;
    p.push('\n');

    writeln!(p, "[5. User-defined downturns]")?;
    if input.analysis.user_period_analyses.is_empty() {
        writeln!(p, "- none within the test period")?;
    }
    for r in &input.analysis.user_period_analyses {
        writeln!(
            p,
            "- {} ({} ~ {})",
            r.name.as_deref().unwrap_or("unnamed"),
            r.start_date,
            r.end_date
        )?;
        writeln!(p, "    - {bm}: {}", format_pct(r.benchmark_return))?;
        writeln!(p, "    - Portfolio: {}", format_pct(r.portfolio_return))?;
        writeln!(p, "    - Inside the portfolio: {}", component_line(r))?;
    }
    p.push('\n');

    writeln!(p, "[Instructions]")?;
    writeln!(
        p,
        "1. Explain MDD and CAGR in at most two sentences, and why MDD matters to an investor."
    )?;
    writeln!(
        p,
        "2. Compare the portfolio with {bm} on return and on stability (MDD)."
    )?;
    writeln!(
        p,
        "3. Using section 3, describe in its own paragraph how fixed income and cash \
         cushioned the portfolio while {bm} fell."
    )?;
    writeln!(
        p,
        "4. Using section 4, compare the numbers for {} and say how well the portfolio held up.",
        day.date
    )?;
    writeln!(
        p,
        "5. Using section 5, comment briefly on each user-defined downturn."
    )?;

    Ok(())
}
