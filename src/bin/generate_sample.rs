//! Writes `sample_data.csv` and `sample_data.parquet`: three Gaussian blobs
//! over a few numeric features, plus an id column, a text column and some
//! missing values, for trying the analysis end to end.

use std::sync::Arc;

use anyhow::Result;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 1200;

/// Box-Muller transform for a normal distribution.
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

struct Segment {
    name: &'static str,
    income: f64,
    spend: f64,
    visits: f64,
}

const SEGMENTS: [Segment; 3] = [
    Segment { name: "budget", income: 30_000.0, spend: 1_200.0, visits: 4.0 },
    Segment { name: "regular", income: 60_000.0, spend: 4_000.0, visits: 12.0 },
    Segment { name: "premium", income: 120_000.0, spend: 11_000.0, visits: 25.0 },
];

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    let mut ids = Vec::with_capacity(ROWS);
    let mut segments = Vec::with_capacity(ROWS);
    let mut incomes: Vec<Option<f64>> = Vec::with_capacity(ROWS);
    let mut spends = Vec::with_capacity(ROWS);
    let mut visits = Vec::with_capacity(ROWS);

    for i in 0..ROWS {
        let seg = &SEGMENTS[rng.gen_range(0..SEGMENTS.len())];
        ids.push(i as i64 + 1);
        segments.push(seg.name);
        // Roughly 3% of incomes are missing.
        let income = gauss(&mut rng, seg.income, seg.income * 0.08);
        incomes.push((rng.gen::<f64>() > 0.03).then_some(income.round()));
        spends.push(gauss(&mut rng, seg.spend, seg.spend * 0.1).max(0.0));
        visits.push(gauss(&mut rng, seg.visits, 2.0).max(0.0).round());
    }

    // -- CSV --
    let mut writer = csv::Writer::from_path("sample_data.csv")?;
    writer.write_record(["customer_id", "segment", "annual income", "spend", "visits"])?;
    for i in 0..ROWS {
        writer.write_record([
            ids[i].to_string(),
            segments[i].to_string(),
            incomes[i].map(|v| v.to_string()).unwrap_or_default(),
            format!("{:.2}", spends[i]),
            visits[i].to_string(),
        ])?;
    }
    writer.flush()?;
    println!("Wrote sample_data.csv ({ROWS} rows)");

    // -- Parquet --
    let schema = Arc::new(Schema::new(vec![
        Field::new("customer_id", DataType::Int64, false),
        Field::new("segment", DataType::Utf8, false),
        Field::new("annual income", DataType::Float64, true),
        Field::new("spend", DataType::Float64, false),
        Field::new("visits", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(segments)),
            Arc::new(Float64Array::from(incomes)),
            Arc::new(Float64Array::from(spends)),
            Arc::new(Float64Array::from(visits)),
        ],
    )?;
    let file = std::fs::File::create("sample_data.parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    println!("Wrote sample_data.parquet ({ROWS} rows)");

    Ok(())
}
