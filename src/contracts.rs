//! Contract interfaces.
//!
//! Minimal ABI surfaces for the venues and the flash-loan arbitrage
//! contract, generated with `abigen!`.

use ethers::prelude::abigen;

// Uniswap V2-style router: read-only multi-hop quoting.
abigen!(
    IUniswapV2Router02,
    r#"[
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts)
    ]"#
);

// Uniswap V3 Quoter. Declared nonpayable on-chain; quoting goes through
// eth_call so it behaves as a read.
abigen!(
    IQuoter,
    r#"[
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint24 fee, uint256 amountIn, uint160 sqrtPriceLimitX96) external returns (uint256 amountOut)
    ]"#
);

// Flash-loan arbitrage contract. Atomic: borrows `amount` of `asset`,
// executes the hops described by (path, venues, fees), and reverts the
// whole transaction unless the final output covers `minReturn`.
abigen!(
    IFlashArb,
    r#"[
        function executeFlashArb(address asset, uint256 amount, address[] calldata path, address[] calldata venues, uint24[] calldata fees, uint256 minReturn) external returns (uint256 profit)
    ]"#
);
