//! Common test fixtures for the dashboard tests.
//!
//! The JSON builders mirror the response shapes of the public services the
//! gazetteer talks to, trimmed to the fields that are actually read.

use serde_json::{json, Value};

/// A square test municipality, roughly the size of a mid-sized Brazilian city.
pub mod municipality {
    pub const NAME: &str = "Quadrópolis";
    pub const STATE: &str = "SP";
    pub const IBGE_ID: u64 = 3_599_999;

    /// `(min_lon, min_lat, max_lon, max_lat)`
    pub const BBOX: (f64, f64, f64, f64) = (-47.20, -23.00, -47.00, -22.80);

    /// Boundary ring, counter-clockwise, not closed.
    pub fn ring() -> Vec<(f64, f64)> {
        let (x0, y0, x1, y1) = BBOX;
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }

    /// A diamond inscribed in the bbox; corners of the grid fall outside it.
    pub fn diamond_ring() -> Vec<(f64, f64)> {
        let (x0, y0, x1, y1) = BBOX;
        let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        vec![(cx, y0), (x1, cy), (cx, y1), (x0, cy)]
    }
}

/// `GET /api/v1/localidades/municipios/{id}` response.
pub fn ibge_municipality_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "nome": name,
        "microrregiao": {
            "id": 35032,
            "nome": "Campinas",
            "mesorregiao": {
                "id": 3507,
                "nome": "Campinas",
                "UF": {
                    "id": 35,
                    "sigla": "SP",
                    "nome": "São Paulo",
                    "regiao": { "id": 3, "sigla": "SE", "nome": "Sudeste" }
                }
            }
        }
    })
}

/// `GET /api/v3/agregados/{agg}/periodos/2022/variaveis/{var}` response.
pub fn ibge_aggregate_json(value: &str) -> Value {
    json!([{
        "id": "9324",
        "variavel": "População residente",
        "resultados": [{
            "series": [{
                "localidade": { "id": "3509502", "nome": "Campinas (SP)" },
                "serie": { "2022": value }
            }]
        }]
    }])
}

/// `GET /ws/{cep}/json/` response.
pub fn viacep_json(cep: &str, locality: &str, uf: &str) -> Value {
    json!({
        "cep": cep,
        "logradouro": "Avenida Francisco Glicério",
        "bairro": "Centro",
        "localidade": locality,
        "uf": uf,
        "ibge": "3509502"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diamond_inside_bbox() {
        let (x0, y0, x1, y1) = municipality::BBOX;
        for (x, y) in municipality::diamond_ring() {
            assert!(x >= x0 && x <= x1 && y >= y0 && y <= y1);
        }
    }

    #[test]
    fn test_aggregate_shape() {
        let v = ibge_aggregate_json("1139047");
        assert_eq!(v[0]["resultados"][0]["series"][0]["serie"]["2022"], "1139047");
    }
}
