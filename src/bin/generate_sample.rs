use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

const LEAGUES: [&str; 5] = ["Serie A", "Serie B", "Liga", "Premier League", "Bundesliga"];
const TEAMS: [&str; 12] = [
    "Roma", "Lazio", "Inter", "Milan", "Napoli", "Juventus", "Betis", "Celta", "Arsenal", "Chelsea",
    "Bayern", "Hertha",
];
const MARKETS: [&str; 8] = [
    "1 PUNTA", "2 PUNTA", "PARI", "DISPARI", "GOAL", "NOGOAL", "OVER", "UNDER",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Betting odds in [1.10, 4.00], two decimals.
    fn odds(&mut self) -> f64 {
        ((1.10 + self.next_f64() * 2.90) * 100.0).round() / 100.0
    }
}

/// Excel serial number of a date (1900 date system).
fn excel_date(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (date - epoch).num_days() as f64
}

/// Excel fraction-of-day for a kick-off time.
fn excel_time(hour: u32, minute: u32) -> f64 {
    f64::from(hour * 60 + minute) / 1440.0
}

struct Formats {
    header: Format,
    date: Format,
    time: Format,
    odds: Format,
    value_bet: Format,
    favourite: Format,
    live: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold().set_background_color(Color::RGB(0xD9D9D9)),
            date: Format::new().set_num_format("dd/mm/yyyy"),
            time: Format::new().set_num_format("hh:mm:ss"),
            odds: Format::new().set_num_format("0.00"),
            value_bet: Format::new()
                .set_num_format("0.00")
                .set_background_color(Color::RGB(0xC6EFCE)),
            favourite: Format::new().set_background_color(Color::RGB(0xFFEB9C)),
            live: Format::new().set_background_color(Color::RGB(0xFFC7CE)),
        }
    }
}

fn write_header(
    sheet: &mut Worksheet,
    row: u32,
    first_col: u16,
    names: &[&str],
    fmt: &Format,
) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        sheet.write_string_with_format(row, first_col + i as u16, *name, fmt)?;
    }
    Ok(())
}

/// Weekly schedule: header in A1, one match per row.
fn write_schedule(
    sheet: &mut Worksheet,
    rng: &mut SimpleRng,
    fmts: &Formats,
    start: NaiveDate,
) -> Result<usize> {
    sheet.set_name("Palinsesto")?;
    let mut header = vec!["DATA", "ORA", "LEGA", "PARTITA", "ABBINATE"];
    header.extend(MARKETS);
    write_header(sheet, 0, 0, &header, &fmts.header)?;

    let rows = 60;
    for i in 0..rows {
        let row = i as u32 + 1;
        let date = start + Duration::days((i / 10) as i64);
        let hour = 12 + (rng.next_u64() % 10) as u32;
        let minute = [0, 15, 30, 45][(rng.next_u64() % 4) as usize];
        let league = rng.pick(&LEAGUES);
        let home = rng.pick(&TEAMS);
        let away = rng.pick(&TEAMS);

        sheet.write_number_with_format(row, 0, excel_date(date), &fmts.date)?;
        sheet.write_number_with_format(row, 1, excel_time(hour, minute), &fmts.time)?;
        if league == "Serie A" {
            sheet.write_string_with_format(row, 2, league, &fmts.favourite)?;
        } else {
            sheet.write_string(row, 2, league)?;
        }
        sheet.write_string(row, 3, format!("{home} - {away}"))?;
        sheet.write_number(row, 4, (rng.next_u64() % 200) as f64)?;

        for m in 0..MARKETS.len() {
            let col = 5 + m as u16;
            let odds = rng.odds();
            let fmt = if odds >= 3.5 { &fmts.value_bet } else { &fmts.odds };
            sheet.write_number_with_format(row, col, odds, fmt)?;
        }
    }
    Ok(rows)
}

/// Today's archive: a blank first row and column, so the table starts at B2.
fn write_today(
    sheet: &mut Worksheet,
    rng: &mut SimpleRng,
    fmts: &Formats,
    today: NaiveDate,
) -> Result<usize> {
    sheet.set_name("Giornata Odierna")?;
    let header = [
        "DATA", "ORA", "NAZIONE", "LEGA", "SQUADRA CASA", "SQUADRA OSPITE", "ESITO", "PUNTATA",
        "STATO", "QUOTA 1", "QUOTA X", "QUOTA 2", "BANCA", "RESA",
    ];
    write_header(sheet, 1, 1, &header, &fmts.header)?;

    let rows = 25;
    for i in 0..rows {
        let row = i as u32 + 2;
        let hour = 13 + (i % 9) as u32;
        let live = i % 7 == 3;
        let status = if live { "IN CORSO" } else { "DA GIOCARE" };

        sheet.write_number_with_format(row, 1, excel_date(today), &fmts.date)?;
        sheet.write_number_with_format(row, 2, excel_time(hour, 30), &fmts.time)?;
        sheet.write_string(row, 3, "ITALIA")?;
        sheet.write_string(row, 4, rng.pick(&LEAGUES))?;
        sheet.write_string(row, 5, rng.pick(&TEAMS))?;
        sheet.write_string(row, 6, rng.pick(&TEAMS))?;
        sheet.write_string(row, 7, rng.pick(&["1", "X", "2"]))?;
        sheet.write_number(row, 8, (10 + rng.next_u64() % 90) as f64)?;
        if live {
            sheet.write_string_with_format(row, 9, status, &fmts.live)?;
        } else {
            sheet.write_string(row, 9, status)?;
        }
        for col in 10..=14u16 {
            sheet.write_number_with_format(row, col, rng.odds(), &fmts.odds)?;
        }
    }
    Ok(rows)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let fmts = Formats::new();
    let today = chrono::Local::now().date_naive();

    let mut workbook = Workbook::new();
    let scheduled = write_schedule(workbook.add_worksheet(), &mut rng, &fmts, today)?;
    let archived = write_today(workbook.add_worksheet(), &mut rng, &fmts, today)?;

    let output_path = "sample_palinsesto.xlsx";
    workbook
        .save(output_path)
        .with_context(|| format!("writing {output_path}"))?;

    println!(
        "Wrote {scheduled} scheduled matches and {archived} of today's matches to {output_path}"
    );
    Ok(())
}
