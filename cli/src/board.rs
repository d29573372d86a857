use minefair_core::{BombLayout, CellIndex, CellState, Grid, RoundView};

const HIDDEN: char = '.';
const FLAGGED: char = 'F';
const SAFE: char = 'o';
const BOMB: char = '*';

/// Draws the board with row and column numbers. `bombs` is only known once a round
/// is resolved.
pub fn render(grid: Grid, cells: &[CellState], bombs: &[CellIndex]) -> String {
    let header: String = (0..grid.cols()).map(|col| format!("{col:>3}")).collect();
    let mut out = format!("   {header}\n");

    for row in 0..grid.rows() {
        let symbols: String = (0..grid.cols())
            .filter_map(|col| grid.index_of((row, col)))
            .map(|index| format!("{:>3}", symbol(index, cells, bombs)))
            .collect();
        out.push_str(&format!("{row:>3}{symbols}\n"));
    }
    out
}

fn symbol(index: CellIndex, cells: &[CellState], bombs: &[CellIndex]) -> char {
    if bombs.contains(&index) {
        return BOMB;
    }
    match cells.get(usize::from(index)).copied().unwrap_or_default() {
        CellState::Hidden => HIDDEN,
        CellState::Flagged => FLAGGED,
        CellState::Safe => SAFE,
    }
}

pub fn render_view(view: &RoundView) -> Option<String> {
    let grid = view.grid?;
    let bombs = view.layout.as_deref().unwrap_or_default();
    Some(render(grid, &view.cells, bombs))
}

pub fn render_layout(layout: &BombLayout) -> String {
    render(layout.grid(), &[], &layout.indices())
}

#[cfg(test)]
mod tests {
    use super::*;
    use minefair_core::{MemoryWallet, MinesGame, SecureSource, TableConfig};

    #[test]
    fn bombs_override_cell_state() {
        let grid = Grid::new(2, 3).unwrap();
        let cells = [
            CellState::Safe,
            CellState::Flagged,
            CellState::Hidden,
            CellState::Hidden,
            CellState::Hidden,
            CellState::Hidden,
        ];

        let board = render(grid, &cells, &[1, 5]);

        assert_eq!(board, "     0  1  2\n  0  o  *  .\n  1  .  .  *\n");
    }

    #[test]
    fn no_board_before_the_first_round() {
        let wallet = MemoryWallet::new(0);
        let game = MinesGame::new(TableConfig::default(), wallet, SecureSource::new()).unwrap();
        assert_eq!(render_view(&game.view()), None);
    }

    #[test]
    fn layout_only_shows_bombs() {
        let layout = BombLayout::from_indices(Grid::square(2).unwrap(), &[3]).unwrap();
        assert_eq!(render_layout(&layout), "     0  1\n  0  .  .\n  1  .  *\n");
    }
}
