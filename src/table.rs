use std::io::{self, Write};

use crossterm::style::{Color, Stylize, style};

use crate::model::{Aggregation, IdentityColumn, ResourceValue};
use crate::rows::AggregateRow;

const COLUMN_GAP: usize = 2;
const MEBIBYTE: u64 = 1024 * 1024;
const RESOURCE_HEADERS: [&str; 6] = [
    "CPU USE", "CPU REQ", "CPU LIM", "MEM USE", "MEM REQ", "MEM LIM",
];

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum CellStyle {
    #[default]
    Plain,
    Warning,
    Alert,
}

impl CellStyle {
    pub fn for_usage(value: &ResourceValue) -> Self {
        if value.exceeds_limit() {
            Self::Alert
        } else if value.exceeds_request() {
            Self::Warning
        } else {
            Self::Plain
        }
    }

    fn color(self) -> Option<Color> {
        match self {
            Self::Plain => None,
            Self::Warning => Some(Color::Yellow),
            Self::Alert => Some(Color::Red),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Cell {
    pub value: String,
    pub style: CellStyle,
}

impl Cell {
    fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            style: CellStyle::Plain,
        }
    }

    fn styled(value: impl Into<String>, style: CellStyle) -> Self {
        Self {
            value: value.into(),
            style,
        }
    }

    fn width(&self) -> usize {
        self.value.chars().count()
    }
}

/// Fully formatted table: header, body rows in display order, optional footer.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub header: Vec<Cell>,
    pub body: Vec<Vec<Cell>>,
    pub footer: Option<Vec<Cell>>,
}

impl Table {
    pub fn build(
        rows: &[AggregateRow],
        footer: Option<&AggregateRow>,
        aggregation: Aggregation,
        show_nodes: bool,
    ) -> Self {
        let columns = aggregation.identity_columns(show_nodes);
        let header = columns
            .iter()
            .map(|column| column.header())
            .chain(RESOURCE_HEADERS)
            .map(Cell::plain)
            .collect();
        let body = rows.iter().map(|row| format_row(row, &columns)).collect();
        let footer = footer.map(|row| format_row(row, &columns));

        Self {
            header,
            body,
            footer,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &Vec<Cell>> {
        std::iter::once(&self.header)
            .chain(self.body.iter())
            .chain(self.footer.iter())
    }

    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0; self.header.len()];
        for line in self.lines() {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.width());
            }
        }
        widths
    }

    pub fn write_to<W: Write>(&self, out: &mut W, colored: bool) -> io::Result<()> {
        let widths = self.column_widths();
        for line in self.lines() {
            let last = line.len().saturating_sub(1);
            for (index, cell) in line.iter().enumerate() {
                match cell.style.color().filter(|_| colored) {
                    Some(color) => write!(out, "{}", style(&cell.value).with(color))?,
                    None => write!(out, "{}", cell.value)?,
                }
                if index < last {
                    let padding = widths[index] - cell.width() + COLUMN_GAP;
                    write!(out, "{:padding$}", "")?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

fn format_row(row: &AggregateRow, columns: &[IdentityColumn]) -> Vec<Cell> {
    let cpu = row.total_cpu();
    let memory = row.total_memory();

    let mut cells = columns
        .iter()
        .map(|column| {
            Cell::plain(match column {
                IdentityColumn::Namespace => row.namespace.as_str(),
                IdentityColumn::Pod => row.name.as_str(),
                IdentityColumn::Container => row.container.as_str(),
                IdentityColumn::Node => row.node.as_str(),
            })
        })
        .collect::<Vec<_>>();

    cells.extend([
        Cell::styled(format_cpu(cpu.usage), CellStyle::for_usage(&cpu)),
        Cell::plain(format_cpu(cpu.request)),
        Cell::plain(format_cpu(cpu.limit)),
        Cell::styled(format_memory(memory.usage), CellStyle::for_usage(&memory)),
        Cell::plain(format_memory(memory.request)),
        Cell::plain(format_memory(memory.limit)),
    ]);
    cells
}

pub fn format_cpu(millicores: u64) -> String {
    if millicores == 0 {
        return "-".to_string();
    }
    format!("{millicores}m")
}

pub fn format_memory(bytes: u64) -> String {
    if bytes == 0 {
        return "-".to_string();
    }
    format!("{}Mi", bytes / MEBIBYTE)
}
