use ag_table::{AgeGradeResult, AgeGradeTable, Gender};
use ag_utils::times::{parse_race_time, render_time};
use anyhow::Context;

/// Grade a single result and render it for the terminal.
pub fn run_grade(
    table: &AgeGradeTable,
    age: i32,
    gender: &str,
    miles: f64,
    time: &str,
) -> anyhow::Result<(AgeGradeResult, String)> {
    let gender: Gender = gender.parse()?;
    let seconds = parse_race_time(time).with_context(|| format!("bad time {:?}", time))?;
    let result = table.age_grade(age, gender, miles, seconds)?;
    let line = format!(
        "age grade {:.2}%  graded time {}  factor {:.4}",
        result.percent,
        render_time(result.graded_time),
        result.factor
    );
    Ok((result, line))
}
