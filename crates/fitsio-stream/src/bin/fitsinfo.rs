use fitsio_stream::{decode, HeaderCard, HeaderValue, Unit};
use std::process;

const DEFAULT_ROWS: usize = 5;

fn format_unit(index: usize, unit: &Unit) -> String {
    let mut out = String::new();
    let extname = unit
        .header()
        .string("EXTNAME")
        .map(|name| format!(" (EXTNAME: {})", name))
        .unwrap_or_default();
    out.push_str(&format!("HDU {}: {}{}\n", index, unit.class(), extname));
    if let Some(bitpix) = unit.bitpix() {
        out.push_str(&format!("  BITPIX: {}\n", bitpix));
    }
    out.push_str(&format!("  NAXIS: {}\n", unit.naxis().len()));
    if !unit.naxis().is_empty() {
        out.push_str(&format!("  Dimensions: {:?}\n", unit.naxis()));
    }
    if unit.is_random_groups() {
        out.push_str("  Random groups (data not decoded)\n");
    }
    if let Some(image) = unit.image() {
        let (min, max) = unit.stats();
        out.push_str(&format!("  Pixels: {}\n", image.len()));
        out.push_str(&format!("  Min: {}  Max: {}\n", min, max));
    }
    out
}

fn format_table(unit: &Unit, rows: usize) -> String {
    let Some(table) = unit.table() else {
        return String::new();
    };
    let mut out = String::new();
    out.push_str(&format!(
        "  Columns: {}  Rows: {}  Row width: {} bytes\n",
        table.fields().len(),
        table.rows(),
        table.row_len()
    ));
    let columns: Vec<_> = table.fields().iter().filter(|d| d.has_data()).collect();
    for d in &columns {
        out.push_str(&format!("    {:<16} {:<8} {}\n", d.public_name(), d.form, d.display));
    }
    for row in 0..table.rows().min(rows) {
        let cells: Vec<String> = columns.iter().map(|d| unit.format(d.index, row)).collect();
        out.push_str(&format!("  [{}] {}\n", row, cells.join(" ")));
    }
    out
}

fn format_cards(cards: &[HeaderCard]) -> String {
    let mut out = String::from("  Header cards:\n");
    for card in cards {
        match (&card.value, &card.comment) {
            (HeaderValue::Null, Some(comment)) => {
                out.push_str(&format!("    {:<8} {}\n", card.key, comment.trim_end()));
            }
            (HeaderValue::Null, None) => {
                if !card.key.is_empty() {
                    out.push_str(&format!("    {}\n", card.key));
                }
            }
            (value, Some(comment)) => {
                out.push_str(&format!("    {:<8} = {} / {}\n", card.key, value, comment));
            }
            (value, None) => {
                out.push_str(&format!("    {:<8} = {}\n", card.key, value));
            }
        }
    }
    out
}

fn run(args: &[String]) -> Result<String, String> {
    let mut verbose = false;
    let mut rows = DEFAULT_ROWS;
    let mut file_path = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-v" || arg == "--verbose" {
            verbose = true;
        } else if arg == "-n" || arg == "--rows" {
            let count = iter.next().ok_or("Missing value for --rows")?;
            rows = count
                .parse()
                .map_err(|_| format!("Invalid row count: {}", count))?;
        } else if arg.starts_with('-') {
            return Err(format!("Unknown option: {}", arg));
        } else {
            if file_path.is_some() {
                return Err("Too many arguments".to_string());
            }
            file_path = Some(arg.as_str());
        }
    }

    let path = file_path.ok_or_else(|| {
        "Usage: fitsinfo [-v] [-n ROWS] <file.fits>\n\nPrint HDU summary for a FITS file."
            .to_string()
    })?;

    let file =
        std::fs::File::open(path).map_err(|e| format!("Error opening '{}': {}", path, e))?;
    let decoded = decode(std::io::BufReader::new(file));

    let mut out = String::new();
    for (i, unit) in decoded.units.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format_unit(i, unit));
        out.push_str(&format_table(unit, rows));
        if verbose {
            out.push_str(&format_cards(unit.header().cards()));
        }
    }
    match decoded.error {
        Some(e) if decoded.units.is_empty() => Err(format!("Error decoding '{}': {}", path, e)),
        Some(e) => {
            out.push_str(&format!(
                "\nDecoding stopped after {} HDU(s): {}\n",
                decoded.units.len(),
                e
            ));
            Ok(out)
        }
        None => Ok(out),
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => print!("{}", output),
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    }
}
