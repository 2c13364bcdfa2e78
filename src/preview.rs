use anyhow::{Context, Result};
use log::info;

use crate::{
    bucket::Record,
    cli::PreviewArgs,
    config::PipelineConfig,
    pipeline::Pipeline,
    repair,
    table::{self, format_number},
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let config = PipelineConfig::resolve(&args.source)?;
    let census = Pipeline::new(config.clone())
        .census()
        .with_context(|| format!("Repairing {:?}", config.input))?;

    let headers = preview_headers(&census.table.extra_headers);
    let rows = census
        .table
        .records
        .iter()
        .take(args.rows)
        .map(preview_row)
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), config.input);
    Ok(())
}

fn preview_headers(extra_headers: &[String]) -> Vec<String> {
    repair::FIELD_NAMES
        .iter()
        .map(|name| name.to_string())
        .chain(std::iter::once("faixa_etaria".to_string()))
        .chain(extra_headers.iter().cloned())
        .collect()
}

fn preview_row(record: &Record) -> Vec<String> {
    let mut row = vec![
        record.id_municipio.clone(),
        record.sexo.clone(),
        record.grupo_idade.clone(),
        record.alfabetizacao.clone(),
        format_number(record.populacao_indigena),
        record
            .faixa_etaria
            .map(|band| band.to_string())
            .unwrap_or_default(),
    ];
    row.extend(record.extras.iter().cloned());
    row
}
