//! Player season stats for the big-5 European leagues from FBRef.
//!
//! FBRef ships most stat tables inside HTML comments and tags every cell with
//! a `data-stat` attribute; columns are keyed on that attribute, so the
//! scanner below works on raw text and does not care about the comments.

use crate::core::dictionaries::CsvTable;
use crate::core::tables::sha256_hex;
use crate::utils::error::{EtlError, Result};
use crate::utils::text::strip_tags;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_FBREF_URL: &str = "https://fbref.com";
pub const EXCLUDED_STATS: [&str; 2] = ["ranker", "matches"];

/// Join keys before and after the columns are renamed.
const RAW_KEYS: [&str; 3] = ["player", "team", "comp_level"];
pub const KEYS: [&str; 3] = ["jugador", "equipo", "competicion"];
const RAW_MINUTES: &str = "minutes_90s";
const MINUTES: &str = "partidos_completos_90";
const FIRST_COLUMNS: [&str; 5] = ["jugador", "nacionalidad", "posicion", "equipo", "competicion"];
const TEXT_COLUMNS: [&str; 5] = ["player", "nationality", "position", "team", "comp_level"];

static TABLE_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</table\s*>").expect("static regex"));
static TABLE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<table\b").expect("static regex"));
static THEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<thead\b[^>]*>(.*?)</thead>").expect("static regex"));
static TBODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tbody\b[^>]*>(.*?)</tbody>").expect("static regex"));
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr>").expect("static regex"));
static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:th|td)\b([^>]*)>(.*?)</(?:th|td)>").expect("static regex")
});
static DATA_STAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bdata-stat="([^"]*)""#).expect("static regex"));
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bclass="([^"]*)""#).expect("static regex"));
static GK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bGK\b").expect("static regex"));

/// One FBRef stats page and the table ids it may carry.
#[derive(Debug, Clone, Copy)]
pub struct StatPage {
    pub category: &'static str,
    pub table_ids: &'static [&'static str],
    pub pct_cols: &'static [&'static str],
}

impl StatPage {
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/en/comps/Big5/{}/players/Big-5-European-Leagues-Stats",
            base_url.trim_end_matches('/'),
            self.category
        )
    }

    /// File name used when pages are read from a folder of saved HTML.
    pub fn file_name(&self) -> String {
        format!("{}.html", self.category)
    }
}

/// A stats section: one page, optionally extended by a second page joined on
/// player, team and competition.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub label: &'static str,
    pub primary: StatPage,
    pub secondary: Option<StatPage>,
    /// FBRef `data-stat` → output column. The first entry for a stat wins.
    pub names: &'static [(&'static str, &'static str)],
}

const COMMON_NAMES: [(&str, &str); 8] = [
    ("player", "jugador"),
    ("nationality", "nacionalidad"),
    ("position", "posicion"),
    ("team", "equipo"),
    ("comp_level", "competicion"),
    ("age", "edad"),
    ("birth_year", "año_nacimiento"),
    ("minutes_90s", "partidos_completos_90"),
];

const STANDARD_NAMES: &[(&str, &str)] = &[
    COMMON_NAMES[0], COMMON_NAMES[1], COMMON_NAMES[2], COMMON_NAMES[3], COMMON_NAMES[4],
    COMMON_NAMES[5], COMMON_NAMES[6], COMMON_NAMES[7],
    ("games", "partidos_jugados"),
    ("games_starts", "partidos_titular"),
    ("minutes", "minutos"),
    ("goals", "goles"),
    ("assists", "asistencias"),
    ("goals_assists", "goles_asistencias"),
    ("goals_pens", "goles_sin_penalti"),
    ("pens_made", "penales_anotados"),
    ("pens_att", "penales_intentados"),
    ("cards_yellow", "tarjetas_amarillas"),
    ("cards_red", "tarjetas_rojas"),
    ("xg", "xg"),
    ("npxg", "npxg"),
    ("xg_assist", "xg_asistencias"),
    ("npxg_xg_assist", "npxg_xg_asistencias"),
    ("progressive_carries", "conducciones_progresivas"),
    ("progressive_passes", "pases_progresivos"),
    ("progressive_passes_received", "pases_progresivos_recibidos"),
    ("goals_per90", "goles_por90"),
    ("assists_per90", "asistencias_por90"),
    ("goals_assists_per90", "goles_asistencias_por90"),
    ("goals_pens_per90", "goles_penalti_por90"),
    ("goals_assists_pens_per90", "goles_asistencias_penalti_por90"),
    ("xg_per90", "xg_por90"),
    ("xg_assist_per90", "xg_asistencias_por90"),
    ("xg_xg_assist_per90", "xg_xg_asistencias_por90"),
    ("npxg_per90", "npxg_por90"),
    ("npxg_xg_assist_per90", "npxg_xg_asistencias_por90"),
];

const SHOOTING_NAMES: &[(&str, &str)] = &[
    COMMON_NAMES[0], COMMON_NAMES[1], COMMON_NAMES[2], COMMON_NAMES[3], COMMON_NAMES[4],
    COMMON_NAMES[5], COMMON_NAMES[6], COMMON_NAMES[7],
    ("goals", "goles"),
    ("shots", "tiros"),
    ("shots_on_target", "tiros_a_puerta"),
    ("shots_on_target_pct", "porc_tiros_a_puerta"),
    ("shots_per90", "tiros_por90"),
    ("shots_on_target_per90", "tiros_a_puerta_por90"),
    ("goals_per_shot", "goles_por_tiro"),
    ("goals_per_shot_on_target", "goles_por_tiro_a_puerta"),
    ("average_shot_distance", "dist_media_tiro"),
    ("shots_free_kicks", "tiros_libres"),
    ("pens_made", "penales_anotados"),
    ("pens_att", "penales_intentados"),
    ("xg", "xg"),
    ("npxg", "npxg"),
    ("npxg_per_shot", "npxg_por_tiro"),
    ("xg_net", "xg_neto"),
    ("npxg_net", "npxg_neto"),
];

const PASSING_NAMES: &[(&str, &str)] = &[
    COMMON_NAMES[0], COMMON_NAMES[1], COMMON_NAMES[2], COMMON_NAMES[3], COMMON_NAMES[4],
    COMMON_NAMES[5], COMMON_NAMES[6], COMMON_NAMES[7],
    ("passes_completed", "pases_completados"),
    ("passes", "pases"),
    ("passes_pct", "porc_precision_pase"),
    ("passes_total_distance", "dist_total_pases"),
    ("passes_progressive_distance", "dist_progresiva_pases"),
    ("passes_completed_short", "pases_cortos_completados"),
    ("passes_short", "pases_cortos"),
    ("passes_pct_short", "porc_precision_pase_corto"),
    ("passes_completed_medium", "pases_medios_completados"),
    ("passes_medium", "pases_medios"),
    ("passes_pct_medium", "porc_precision_pase_medio"),
    ("passes_completed_long", "pases_largos_completados"),
    ("passes_long", "pases_largos"),
    ("passes_pct_long", "porc_precision_pase_largo"),
    ("assists", "asistencias"),
    ("xg_assist", "xg_asistencias"),
    ("pass_xa", "xa_modelado"),
    ("xg_assist_net", "xg_asistencias_neto"),
    ("assisted_shots", "tiros_asistidos"),
    ("passes_into_final_third", "pases_tercio_final"),
    ("passes_into_penalty_area", "pases_area"),
    ("crosses_into_penalty_area", "centros_area"),
    ("progressive_passes", "pases_progresivos"),
    ("passes_live", "pases_en_juego"),
    ("passes_dead", "pases_balon_parado"),
    ("passes_free_kicks", "pases_tiro_libre"),
    ("through_balls", "pases_al_hueco"),
    ("passes_switches", "cambios_de_juego"),
    ("crosses", "centros"),
    ("throw_ins", "saques_de_banda"),
    ("corner_kicks", "saques_de_esquina"),
    ("corner_kicks_in", "esquinas_hacia_adentro"),
    ("corner_kicks_out", "esquinas_hacia_fuera"),
    ("corner_kicks_straight", "esquinas_rectas"),
    ("passes_offsides", "pases_fuera_de_juego"),
    ("passes_blocked", "pases_bloqueados"),
];

const POSSESSION_NAMES: &[(&str, &str)] = &[
    COMMON_NAMES[0], COMMON_NAMES[1], COMMON_NAMES[2], COMMON_NAMES[3], COMMON_NAMES[4],
    COMMON_NAMES[5], COMMON_NAMES[6], COMMON_NAMES[7],
    ("touches", "toques"),
    ("touches_def_pen_area", "toques_area_propia"),
    ("touches_def_3rd", "toques_tercio_defensivo"),
    ("touches_mid_3rd", "toques_tercio_medio"),
    ("touches_att_3rd", "toques_tercio_ofensivo"),
    ("touches_att_pen_area", "toques_area_rival"),
    ("touches_live_ball", "toques_en_juego"),
    ("take_ons", "regates_intentados"),
    ("take_ons_won", "regates_exitosos"),
    ("take_ons_won_pct", "porc_regates_exitosos"),
    ("take_ons_tackled", "regates_no_exitosos"),
    ("take_ons_tackled_pct", "porc_regates_no_exitosos"),
    ("carries", "conducciones"),
    ("carries_distance", "distancia_conducciones"),
    ("carries_progressive_distance", "distancia_conducciones_progresivas"),
    ("progressive_carries", "conducciones_progresivas"),
    ("carries_into_final_third", "conducciones_tercio_final"),
    ("carries_into_penalty_area", "conducciones_area"),
    ("miscontrols", "malos_controles"),
    ("dispossessed", "perdidas"),
    ("passes_received", "pases_recibidos"),
    ("progressive_passes_received", "pases_progresivos_recibidos"),
];

const MISC_DEFENSE_NAMES: &[(&str, &str)] = &[
    COMMON_NAMES[0], COMMON_NAMES[1], COMMON_NAMES[2], COMMON_NAMES[3], COMMON_NAMES[4],
    COMMON_NAMES[5], COMMON_NAMES[6], COMMON_NAMES[7],
    ("cards_yellow", "tarjetas_amarillas"),
    ("cards_red", "tarjetas_rojas"),
    ("cards_yellow_red", "doble_amarilla"),
    ("fouls", "faltas_cometidas"),
    ("fouled", "faltas_recibidas"),
    ("offsides", "fueras_de_juego"),
    ("crosses", "centros"),
    ("interceptions", "intercepciones"),
    ("tackles_won", "entradas_ganadas"),
    ("pens_won", "penaltis_ganados"),
    ("pens_conceded", "penaltis_concedidos"),
    ("own_goals", "autogoles"),
    ("ball_recoveries", "recuperaciones"),
    ("aerials_won", "duelos_aereos_ganados"),
    ("aerials_lost", "duelos_aereos_perdidos"),
    ("aerials_won_pct", "porc_duelos_aereos_ganados"),
    ("tackles", "entradas"),
    ("tackles_def_3rd", "entradas_tercio_defensivo"),
    ("tackles_mid_3rd", "entradas_tercio_medio"),
    ("tackles_att_3rd", "entradas_tercio_ofensivo"),
    ("challenge_tackles", "regates_parados"),
    ("challenges", "regates_enfrentados"),
    ("challenge_tackles_pct", "porc_regates_parados"),
    ("challenges_lost", "regates_no_parados"),
    ("blocks", "bloqueos"),
    ("blocked_shots", "tiros_bloqueados"),
    ("blocked_passes", "pases_bloqueados"),
    ("tackles_interceptions", "entradas_mas_intercepciones"),
    ("clearances", "despejes"),
    ("errors", "errores"),
];

const KEEPER_NAMES: &[(&str, &str)] = &[
    COMMON_NAMES[0], COMMON_NAMES[1], COMMON_NAMES[2], COMMON_NAMES[3], COMMON_NAMES[4],
    COMMON_NAMES[5], COMMON_NAMES[6], COMMON_NAMES[7],
    ("gk_minutes", "minutos"),
    ("gk_games", "pj"),
    ("gk_games_starts", "titular"),
    ("gk_goals_against", "goles_en_contra"),
    ("gk_goals_against_per90", "goles_contra_por90"),
    ("gk_shots_on_target_against", "tiros_a_puerta_en_contra"),
    ("gk_saves", "paradas"),
    ("gk_save_pct", "porc_paradas"),
    ("gk_wins", "victorias"),
    ("gk_ties", "empates"),
    ("gk_losses", "derrotas"),
    ("gk_clean_sheets", "porterias_cero"),
    ("gk_clean_sheets_pct", "porc_porterias_cero"),
    ("gk_pens_att", "penales_recibidos"),
    ("gk_pens_allowed", "penales_concedidos"),
    ("gk_pens_saved", "penales_parados"),
    ("gk_pens_missed", "penales_fallados"),
    ("gk_pens_save_pct", "porc_penales_parados"),
    ("gk_free_kick_goals_against", "goles_falta_directa_en_contra"),
    ("gk_corner_kick_goals_against", "goles_corners_en_contra"),
    ("gk_own_goals_against", "autogoles_en_contra"),
    ("gk_psxg", "psxg_en_contra"),
    ("gk_psnpxg_per_shot_on_target_against", "psnpxg_por_tiro_en_contra"),
    ("gk_psxg_net", "psxg_neto"),
    ("gk_psxg_net_per90", "psxg_neto_por90"),
    ("gk_passes_completed_launched", "pases_largos_completados"),
    ("gk_passes_launched", "pases_largos"),
    ("gk_passes_pct_launched", "porc_pases_largos_completados"),
    ("gk_passes", "pases_totales"),
    ("gk_passes_throws", "saques_con_la_mano"),
    ("gk_pct_passes_launched", "porc_pases_lanzados"),
    ("gk_passes_length_avg", "long_media_pase"),
    ("gk_goal_kicks", "saques_de_porteria"),
    ("gk_pct_goal_kicks_launched", "porc_saques_largos"),
    ("gk_goal_kick_length_avg", "long_media_saque"),
    ("gk_crosses", "centros_defendidos"),
    ("gk_crosses_stopped", "centros_atrapados"),
    ("gk_crosses_stopped_pct", "porc_centros_atrapados"),
    ("gk_def_actions_outside_pen_area", "acciones_fuera_del_area"),
    ("gk_def_actions_outside_pen_area_per90", "acciones_fuera_del_area_por90"),
    ("gk_avg_distance_def_actions", "dist_media_acciones_fuera_area"),
];

pub const STANDARD: Section = Section {
    label: "standard",
    primary: StatPage {
        category: "stats",
        table_ids: &["stats_standard"],
        pct_cols: &[],
    },
    secondary: None,
    names: STANDARD_NAMES,
};

pub const SHOOTING: Section = Section {
    label: "shooting",
    primary: StatPage {
        category: "shooting",
        table_ids: &["stats_shooting"],
        pct_cols: &[
            "shots_on_target_pct",
            "goals_per_shot",
            "goals_per_shot_on_target",
            "npxg_per_shot",
        ],
    },
    secondary: None,
    names: SHOOTING_NAMES,
};

pub const PASSING: Section = Section {
    label: "passing",
    primary: StatPage {
        category: "passing",
        table_ids: &["stats_passing"],
        pct_cols: &["passes_pct", "passes_pct_short", "passes_pct_medium", "passes_pct_long"],
    },
    secondary: Some(StatPage {
        category: "passing_types",
        table_ids: &["stats_passing_types"],
        pct_cols: &[],
    }),
    names: PASSING_NAMES,
};

pub const POSSESSION: Section = Section {
    label: "possession",
    primary: StatPage {
        category: "possession",
        table_ids: &["stats_possession"],
        pct_cols: &["take_ons_won_pct", "take_ons_tackled_pct"],
    },
    secondary: None,
    names: POSSESSION_NAMES,
};

pub const MISC_DEFENSE: Section = Section {
    label: "misc+defense",
    primary: StatPage {
        category: "misc",
        table_ids: &["stats_misc"],
        pct_cols: &["aerials_won_pct"],
    },
    secondary: Some(StatPage {
        category: "defense",
        table_ids: &["stats_defense", "div_stats_defense"],
        pct_cols: &["challenge_tackles_pct"],
    }),
    names: MISC_DEFENSE_NAMES,
};

pub const KEEPERS: Section = Section {
    label: "goalkeepers",
    primary: StatPage {
        category: "keepers",
        table_ids: &["stats_keeper"],
        pct_cols: &["gk_save_pct", "gk_clean_sheets_pct", "gk_pens_save_pct"],
    },
    secondary: Some(StatPage {
        category: "keepersadv",
        table_ids: &["stats_keeper_adv"],
        pct_cols: &[
            "gk_psnpxg_per_shot_on_target_against",
            "gk_psxg_net_per90",
            "gk_pct_passes_launched",
            "gk_pct_goal_kicks_launched",
            "gk_crosses_stopped_pct",
        ],
    }),
    names: KEEPER_NAMES,
};

pub const SECTIONS: [Section; 6] = [STANDARD, SHOOTING, PASSING, POSSESSION, MISC_DEFENSE, KEEPERS];

/// Every page the sections read, in fetch order.
pub fn stat_pages() -> Vec<StatPage> {
    SECTIONS
        .iter()
        .flat_map(|s| std::iter::once(s.primary).chain(s.secondary))
        .collect()
}

/// Downloaded HTML by page category.
pub type StatPages = HashMap<&'static str, String>;

/// The `<table>...</table>` with `table_id`, or the first table inside the
/// element with that id.
pub fn find_table<'a>(html: &'a str, table_id: &str) -> Option<&'a str> {
    let id = regex::escape(table_id);
    let tagged = Regex::new(&format!(r#"(?i)<table\b[^>]*\sid="{}""#, id)).ok()?;
    let start = match tagged.find(html) {
        Some(m) => m.start(),
        None => {
            let holder = Regex::new(&format!(r#"(?i)<[a-z][^>]*\sid="{}"[^>]*>"#, id)).ok()?;
            let after = holder.find(html)?.end();
            after + TABLE_OPEN_RE.find(&html[after..])?.start()
        }
    };
    let end = start + TABLE_CLOSE_RE.find(&html[start..])?.end();
    Some(&html[start..end])
}

pub fn find_any_table<'a>(html: &'a str, table_ids: &[&str]) -> Option<&'a str> {
    table_ids.iter().find_map(|id| find_table(html, id))
}

fn data_stat(attrs: &str) -> Option<&str> {
    DATA_STAT_RE
        .captures(attrs)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

/// Raw cell text of a stats table. Columns come from the last header row;
/// header rows repeated inside the body are skipped.
pub fn parse_stat_table(table_html: &str, exclude: &[&str]) -> CsvTable {
    let headers: Vec<String> = THEAD_RE
        .captures(table_html)
        .and_then(|c| ROW_RE.captures_iter(&c[1]).last().map(|r| r[2].to_string()))
        .map(|row| {
            CELL_RE
                .captures_iter(&row)
                .map(|cell| {
                    data_stat(&cell[1])
                        .map(str::to_string)
                        .unwrap_or_else(|| strip_tags(&cell[2]))
                })
                .filter(|h| !h.is_empty() && !exclude.contains(&h.as_str()))
                .collect()
        })
        .unwrap_or_default();

    let body = TBODY_RE
        .captures(table_html)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let mut rows = Vec::new();
    for row in ROW_RE.captures_iter(&body) {
        let is_header = CLASS_RE
            .captures(&row[1])
            .is_some_and(|c| c[1].split_whitespace().any(|cls| cls == "thead"));
        if is_header {
            continue;
        }
        let cells: HashMap<&str, String> = CELL_RE
            .captures_iter(&row[2])
            .filter_map(|cell| {
                let stat = data_stat(cell.get(1)?.as_str())?;
                Some((stat, strip_tags(&cell[2])))
            })
            .collect();
        if cells.values().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows.push(
            headers
                .iter()
                .map(|h| cells.get(h.as_str()).cloned().unwrap_or_default())
                .collect(),
        );
    }
    CsvTable { headers, rows }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Text(String),
    Number(f64),
    /// No matching row in a joined table.
    Empty,
}

impl StatValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            StatValue::Number(n) => *n,
            _ => 0.0,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Text(s) => f.write_str(s),
            StatValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            StatValue::Number(n) => write!(f, "{}", n),
            StatValue::Empty => Ok(()),
        }
    }
}

/// The text from the first uppercase letter on: `"eng Premier League"` →
/// `"Premier League"`, `"es ESP"` → `"ESP"`.
fn from_first_upper(s: &str) -> Option<&str> {
    let s = s.trim();
    s.char_indices()
        .find(|(_, c)| c.is_uppercase())
        .map(|(i, _)| s[i..].trim())
}

fn parse_pct(s: &str) -> f64 {
    let kept: String = s
        .replace('%', "")
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    kept.parse().unwrap_or(0.0)
}

fn parse_count(s: &str) -> f64 {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    kept.parse().unwrap_or(0.0)
}

/// Typed stats table. Rows always have one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<StatValue>>,
}

impl StatTable {
    /// Text columns stay text; everything else becomes a number, with blanks
    /// and unparseable cells as 0. Rows without a player are dropped.
    pub fn from_raw(raw: &CsvTable, pct_cols: &[&str]) -> Self {
        let columns = raw.headers.clone();
        let player = columns.iter().position(|c| c == "player");
        let rows = raw
            .rows
            .iter()
            .filter(|row| {
                player.map_or(true, |i| row.get(i).is_some_and(|p| !p.trim().is_empty()))
            })
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| {
                        let v = row.get(i).map(String::as_str).unwrap_or("");
                        match col.as_str() {
                            "comp_level" => {
                                StatValue::Text(from_first_upper(v).unwrap_or("").to_string())
                            }
                            "nationality" => {
                                StatValue::Text(from_first_upper(v).unwrap_or("UNK").to_string())
                            }
                            c if TEXT_COLUMNS.contains(&c) => StatValue::Text(v.trim().to_string()),
                            c if pct_cols.contains(&c) => StatValue::Number(parse_pct(v)),
                            _ => StatValue::Number(parse_count(v)),
                        }
                    })
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&StatValue> {
        self.rows.get(row)?.get(self.column(column)?)
    }

    fn key_of(&self, row: &[StatValue], keys: &[Option<usize>]) -> Vec<String> {
        keys.iter()
            .map(|k| k.and_then(|i| row.get(i)).map(ToString::to_string).unwrap_or_default())
            .collect()
    }

    /// One row per key: the one with the most `minutes` when that column is
    /// present (rows come out in that order), else the first seen.
    pub fn dedupe_by(&self, keys: &[&str], minutes: &str) -> Self {
        let key_idx: Vec<Option<usize>> = keys.iter().map(|k| self.column(k)).collect();
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        if let Some(m) = self.column(minutes) {
            order.sort_by(|&a, &b| self.rows[b][m].as_f64().total_cmp(&self.rows[a][m].as_f64()));
        }
        let mut seen = HashSet::new();
        let rows = order
            .into_iter()
            .filter(|&i| seen.insert(self.key_of(&self.rows[i], &key_idx)))
            .map(|i| self.rows[i].clone())
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Left join on `keys`, adding only the columns of `right` this table
    /// does not have yet.
    pub fn merge_new_columns(&self, right: &StatTable, keys: &[&str]) -> Self {
        let added: Vec<usize> = right
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !keys.contains(&c.as_str()) && self.column(c).is_none())
            .map(|(i, _)| i)
            .collect();

        let right_keys: Vec<Option<usize>> = keys.iter().map(|k| right.column(k)).collect();
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            index.entry(right.key_of(row, &right_keys)).or_insert(i);
        }

        let left_keys: Vec<Option<usize>> = keys.iter().map(|k| self.column(k)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let matched = index.get(&self.key_of(row, &left_keys)).map(|&j| &right.rows[j]);
                let mut out = row.clone();
                out.extend(added.iter().map(|&c| {
                    matched
                        .and_then(|r| r.get(c))
                        .cloned()
                        .unwrap_or(StatValue::Empty)
                }));
                out
            })
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(added.iter().map(|&c| right.columns[c].clone()));
        Self { columns, rows }
    }

    pub fn rename(&mut self, names: &[(&str, &str)]) {
        for col in &mut self.columns {
            if let Some((_, to)) = names.iter().find(|(from, _)| from == col) {
                *col = to.to_string();
            }
        }
    }

    /// Move `first` (those present) to the front, keeping the rest in order.
    pub fn move_to_front(&mut self, first: &[&str]) {
        let mut order: Vec<usize> = first.iter().filter_map(|c| self.column(c)).collect();
        let rest: Vec<usize> = (0..self.columns.len()).filter(|i| !order.contains(i)).collect();
        order.extend(rest);
        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = order.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// Replace a column's values, or append it.
    pub fn set_column(&mut self, name: &str, values: Vec<StatValue>) {
        match self.column(name) {
            Some(i) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[i] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[StatValue]) -> bool) {
        self.rows.retain(|r| keep(r));
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(ToString::to_string))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Parse, clean and join one section, then rename its columns.
pub fn build_section(section: &Section, pages: &StatPages) -> Result<StatTable> {
    let load = |page: &StatPage| -> Result<StatTable> {
        let html = pages
            .get(page.category)
            .ok_or_else(|| EtlError::processing(format!("FBRef page '{}' was not fetched", page.category)))?;
        let table = find_any_table(html, page.table_ids).ok_or_else(|| {
            EtlError::processing(format!(
                "no table {} in FBRef page '{}'",
                page.table_ids.join("/"),
                page.category
            ))
        })?;
        Ok(StatTable::from_raw(
            &parse_stat_table(table, &EXCLUDED_STATS),
            page.pct_cols,
        ))
    };

    let mut table = load(&section.primary)?;
    if let Some(secondary) = &section.secondary {
        let extra = load(secondary)?.dedupe_by(&RAW_KEYS, RAW_MINUTES);
        table = table.merge_new_columns(&extra, &RAW_KEYS);
    }
    table.rename(section.names);
    table.move_to_front(&FIRST_COLUMNS);
    tracing::debug!(
        "FBRef {}: {} rows, {} columns",
        section.label,
        table.len(),
        table.columns.len()
    );
    Ok(table)
}

/// Clean-sheet, save and penalty-save percentages recomputed from the counts,
/// then every percentage clipped to [0, 100].
pub fn fix_keeper_percentages(table: &mut StatTable) {
    for (target, num, den) in [
        ("porc_porterias_cero", "porterias_cero", "pj"),
        ("porc_paradas", "paradas", "tiros_a_puerta_en_contra"),
        ("porc_penales_parados", "penales_parados", "penales_recibidos"),
    ] {
        let (Some(n), Some(d)) = (table.column(num), table.column(den)) else {
            continue;
        };
        let values = table
            .rows
            .iter()
            .map(|row| {
                let den = row[d].as_f64();
                StatValue::Number(if den > 0.0 { row[n].as_f64() * 100.0 / den } else { 0.0 })
            })
            .collect();
        table.set_column(target, values);
    }

    let pct: Vec<usize> = (0..table.columns.len())
        .filter(|&i| table.columns[i].starts_with("porc_") || table.columns[i].ends_with("_pct"))
        .collect();
    for row in &mut table.rows {
        for &i in &pct {
            if let StatValue::Number(v) = &mut row[i] {
                *v = v.clamp(0.0, 100.0);
            }
        }
    }
}

/// Hash of `jugador|equipo|competicion|season`, one per player stint.
pub fn add_stint_id(table: &mut StatTable) -> Result<()> {
    let idx = ["jugador", "equipo", "competicion", "season"]
        .iter()
        .map(|c| {
            table
                .column(c)
                .ok_or_else(|| EtlError::processing(format!("stint_id needs column '{}'", c)))
        })
        .collect::<Result<Vec<_>>>()?;
    let ids = table
        .rows
        .iter()
        .map(|row| {
            let joined = idx
                .iter()
                .map(|&i| row[i].to_string())
                .collect::<Vec<_>>()
                .join("|");
            StatValue::Text(sha256_hex(joined.as_bytes()))
        })
        .collect();
    table.set_column("stint_id", ids);
    Ok(())
}

/// Outfield players and goalkeepers, one row per stint.
#[derive(Debug, Clone)]
pub struct FbrefMasters {
    pub outfield: StatTable,
    pub goalkeepers: StatTable,
}

pub fn build_masters(pages: &StatPages, season: &str) -> Result<FbrefMasters> {
    let mut tables = BTreeMap::new();
    for section in &SECTIONS {
        let mut table = build_section(section, pages)?;
        let n = table.len();
        table.set_column("season", vec![StatValue::Text(season.to_string()); n]);
        tables.insert(section.label, table.dedupe_by(&KEYS, MINUTES));
    }
    let mut section = |label: &str| {
        tables
            .remove(label)
            .ok_or_else(|| EtlError::processing(format!("section {} missing", label)))
    };

    let mut outfield = section(STANDARD.label)?;
    for label in [SHOOTING.label, PASSING.label, MISC_DEFENSE.label, POSSESSION.label] {
        outfield = outfield.merge_new_columns(&section(label)?, &KEYS);
    }
    if let Some(pos) = outfield.column("posicion") {
        outfield.retain_rows(|row| !GK_RE.is_match(&row[pos].to_string()));
    }
    add_stint_id(&mut outfield)?;

    let mut goalkeepers = section(KEEPERS.label)?;
    fix_keeper_percentages(&mut goalkeepers);
    add_stint_id(&mut goalkeepers)?;

    Ok(FbrefMasters {
        outfield,
        goalkeepers,
    })
}

/// Row counts, duplicate stints, blank keys, rows per competition and the
/// minutes spread.
pub fn log_quality(label: &str, table: &StatTable) {
    tracing::info!("📊 {}: {} rows x {} columns", label, table.len(), table.columns.len());

    if let Some(i) = table.column("stint_id") {
        let unique: HashSet<String> = table.rows.iter().map(|r| r[i].to_string()).collect();
        let dups = table.len() - unique.len();
        if dups > 0 {
            tracing::warn!("⚠️ {}: {} duplicate stint_id values", label, dups);
        }
    }
    for key in KEYS {
        if let Some(i) = table.column(key) {
            let blank = table.rows.iter().filter(|r| r[i].to_string().trim().is_empty()).count();
            if blank > 0 {
                tracing::warn!("⚠️ {}: {} rows without {}", label, blank, key);
            }
        }
    }
    if let Some(i) = table.column("competicion") {
        let mut per_comp: BTreeMap<String, usize> = BTreeMap::new();
        for row in &table.rows {
            *per_comp.entry(row[i].to_string()).or_default() += 1;
        }
        for (comp, n) in per_comp {
            tracing::info!("   {}: {}", comp, n);
        }
    }
    if let Some(i) = table.column("minutos").filter(|_| !table.is_empty()) {
        let minutes: Vec<f64> = table.rows.iter().map(|r| r[i].as_f64()).collect();
        let min = minutes.iter().copied().fold(f64::INFINITY, f64::min);
        let max = minutes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = minutes.iter().sum::<f64>() / minutes.len() as f64;
        tracing::info!("   minutos: min {} max {} mean {:.1}", min, max, mean);
    }
}

/// `jugadores_campo_2025_2026.csv` style names.
pub fn output_file(prefix: &str, season: &str) -> String {
    format!("{}_{}.csv", prefix, season.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> StatValue {
        StatValue::Number(v)
    }

    fn t(v: &str) -> StatValue {
        StatValue::Text(v.to_string())
    }

    const SHOOTING_TABLE: &str = r#"<table class="stats_table" id="stats_shooting">
<thead>
<tr class="over_header"><th colspan="8">Standard</th></tr>
<tr><th data-stat="ranker">Rk</th><th data-stat="player">Player</th><th data-stat="nationality">Nation</th>
<th data-stat="comp_level">Comp</th><th data-stat="shots">Sh</th><th data-stat="shots_on_target_pct">SoT%</th>
<th data-stat="goals">Gls</th><th data-stat="matches">Matches</th></tr>
</thead>
<tbody>
<tr><th data-stat="ranker">1</th><td data-stat="player"><a href="/p/1">Kylian Mbapp&amp;eacute;</a></td>
<td data-stat="nationality"><a><span>fr</span> FRA</a></td><td data-stat="comp_level"><a>es</a> La Liga</td>
<td data-stat="shots">1,204</td><td data-stat="shots_on_target_pct">45,5%</td><td data-stat="goals">+3</td>
<td data-stat="matches">Matches</td></tr>
<tr class="thead"><th data-stat="ranker">Rk</th><td data-stat="player">Player</td></tr>
<tr><th data-stat="ranker">2</th><td data-stat="player"></td><td data-stat="shots">4</td></tr>
<tr><th data-stat="ranker">3</th><td data-stat="player">Nobody</td><td data-stat="nationality"></td>
<td data-stat="comp_level"></td><td data-stat="shots"></td><td data-stat="shots_on_target_pct">n/a</td>
<td data-stat="goals">2</td></tr>
</tbody>
</table>"#;

    #[test]
    fn test_find_table_visible_commented_and_container() {
        assert!(find_table(SHOOTING_TABLE, "stats_shooting").is_some_and(|t| t.ends_with("</table>")));

        let commented = format!(r#"<div id="all_stats_shooting"><!--{}--></div>"#, SHOOTING_TABLE);
        let table = find_table(&commented, "stats_shooting").unwrap();
        assert!(table.starts_with("<table") && table.ends_with("</table>"));

        let container = r#"<div id="div_stats_defense"><table class="x"><tbody></tbody></table></div>"#;
        assert_eq!(find_table(container, "stats_defense"), None);
        assert_eq!(
            find_any_table(container, &["stats_defense", "div_stats_defense"]),
            Some(r#"<table class="x"><tbody></tbody></table>"#)
        );
    }

    #[test]
    fn test_parse_and_clean_stat_table() {
        let raw = parse_stat_table(SHOOTING_TABLE, &EXCLUDED_STATS);
        assert_eq!(
            raw.headers,
            vec!["player", "nationality", "comp_level", "shots", "shots_on_target_pct", "goals"]
        );
        // The repeated header row is skipped; the row with only a shot count is kept here.
        assert_eq!(raw.rows.len(), 3);

        let table = StatTable::from_raw(&raw, &["shots_on_target_pct"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "nationality"), Some(&t("FRA")));
        assert_eq!(table.value(0, "comp_level"), Some(&t("La Liga")));
        assert_eq!(table.value(0, "shots"), Some(&n(1204.0)));
        assert_eq!(table.value(0, "shots_on_target_pct"), Some(&n(45.5)));
        assert_eq!(table.value(0, "goals"), Some(&n(3.0)));
        assert_eq!(table.value(1, "nationality"), Some(&t("UNK")));
        assert_eq!(table.value(1, "comp_level"), Some(&t("")));
        assert_eq!(table.value(1, "shots"), Some(&n(0.0)));
        assert_eq!(table.value(1, "shots_on_target_pct"), Some(&n(0.0)));
    }

    fn stints(rows: &[(&str, &str, f64, f64)]) -> StatTable {
        StatTable {
            columns: vec!["jugador".into(), "equipo".into(), "competicion".into(), MINUTES.into(), "goles".into()],
            rows: rows
                .iter()
                .map(|(p, team, mins, goals)| vec![t(p), t(team), t("La Liga"), n(*mins), n(*goals)])
                .collect(),
        }
    }

    #[test]
    fn test_dedupe_keeps_most_minutes() {
        let table = stints(&[("Pedri", "Barcelona", 3.0, 0.0), ("Pedri", "Barcelona", 9.5, 1.0), ("Isco", "Betis", 5.0, 2.0)]);
        let deduped = table.dedupe_by(&KEYS, MINUTES);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped.rows[0][4], n(1.0));
        assert_eq!(deduped.rows[1][0], t("Isco"));

        let unsorted = table.dedupe_by(&KEYS, "no_such_column");
        assert_eq!(unsorted.rows[0][4], n(0.0));
    }

    #[test]
    fn test_merge_adds_only_new_columns() {
        let left = stints(&[("Pedri", "Barcelona", 9.5, 1.0), ("Isco", "Betis", 5.0, 2.0)]);
        let right = StatTable {
            columns: vec!["jugador".into(), "equipo".into(), "competicion".into(), "goles".into(), "tiros".into()],
            rows: vec![vec![t("Pedri"), t("Barcelona"), t("La Liga"), n(99.0), n(14.0)]],
        };
        let merged = left.merge_new_columns(&right, &KEYS);
        assert_eq!(merged.columns.last().map(String::as_str), Some("tiros"));
        assert_eq!(merged.columns.iter().filter(|c| *c == "goles").count(), 1);
        assert_eq!(merged.value(0, "goles"), Some(&n(1.0)));
        assert_eq!(merged.value(0, "tiros"), Some(&n(14.0)));
        assert_eq!(merged.value(1, "tiros"), Some(&StatValue::Empty));
    }

    #[test]
    fn test_rename_and_front_columns() {
        let mut table = StatTable {
            columns: vec!["gk_goals_against".into(), "team".into(), "player".into()],
            rows: vec![vec![n(4.0), t("Girona"), t("Gazzaniga")]],
        };
        table.rename(KEEPER_NAMES);
        table.move_to_front(&FIRST_COLUMNS);
        assert_eq!(table.columns, vec!["jugador", "equipo", "goles_en_contra"]);
        assert_eq!(table.rows[0], vec![t("Gazzaniga"), t("Girona"), n(4.0)]);
    }

    #[test]
    fn test_keeper_percentages_recomputed_and_clipped() {
        let mut table = StatTable {
            columns: ["pj", "porterias_cero", "porc_porterias_cero", "paradas", "tiros_a_puerta_en_contra", "gk_crosses_stopped_pct"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: vec![
                vec![n(4.0), n(1.0), n(80.0), n(6.0), n(8.0), n(140.0)],
                vec![n(0.0), n(0.0), n(12.0), n(0.0), n(0.0), n(-3.0)],
            ],
        };
        fix_keeper_percentages(&mut table);
        assert_eq!(table.value(0, "porc_porterias_cero"), Some(&n(25.0)));
        assert_eq!(table.value(0, "porc_paradas"), Some(&n(75.0)));
        assert_eq!(table.value(0, "gk_crosses_stopped_pct"), Some(&n(100.0)));
        assert_eq!(table.value(1, "porc_porterias_cero"), Some(&n(0.0)));
        assert_eq!(table.value(1, "gk_crosses_stopped_pct"), Some(&n(0.0)));
        assert!(table.column("porc_penales_parados").is_none());
    }

    #[test]
    fn test_stint_id_is_stable_and_needs_season() {
        let mut table = stints(&[("Pedri", "Barcelona", 9.5, 1.0)]);
        assert!(add_stint_id(&mut table).is_err());

        table.set_column("season", vec![t("2025-2026")]);
        add_stint_id(&mut table).unwrap();
        assert_eq!(
            table.value(0, "stint_id"),
            Some(&t(&sha256_hex(b"Pedri|Barcelona|La Liga|2025-2026")))
        );
    }

    #[test]
    fn test_values_and_names() {
        assert_eq!(n(12.0).to_string(), "12");
        assert_eq!(n(0.25).to_string(), "0.25");
        assert_eq!(StatValue::Empty.to_string(), "");
        assert_eq!(output_file("porteros", "2025-2026"), "porteros_2025_2026.csv");
        assert_eq!(
            KEEPERS.primary.url("https://fbref.com/"),
            "https://fbref.com/en/comps/Big5/keepers/players/Big-5-European-Leagues-Stats"
        );
        assert_eq!(stat_pages().len(), 9);
    }
}
