use embassy_executor::Spawner;
use embassy_net::{Config, Runner, Stack, StackResources};
use esp_radio::wifi::WifiDevice;
use hivemon_hal_esp32s3::network::ConnectivityHandle;
use log::info;
use static_cell::StaticCell;

const STACK_SOCKETS: usize = 4;

static NET_RESOURCES: StaticCell<StackResources<STACK_SOCKETS>> = StaticCell::new();

/// Entry point on the network executor. The stack types are not `Send`, so
/// they are built here rather than in `main`.
#[embassy_executor::task]
pub(super) async fn net_bootstrap(
    device: WifiDevice<'static>,
    seed: u64,
    link: &'static ConnectivityHandle,
) {
    let spawner = Spawner::for_current_executor().await;
    spawner.must_spawn(net_task(device, seed, link));
}

#[embassy_executor::task]
async fn net_task(device: WifiDevice<'static>, seed: u64, link: &'static ConnectivityHandle) {
    let (stack, mut runner) = embassy_net::new(
        device,
        Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    info!("net: stack running");
    embassy_futures::join::join(run_stack(&mut runner), watch_address(stack, link)).await;
}

async fn run_stack(runner: &mut Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

async fn watch_address(stack: Stack<'static>, link: &'static ConnectivityHandle) {
    loop {
        stack.wait_config_up().await;
        let address = stack.config_v4().map(|config| config.address.address());
        info!("net: DHCP lease {:?}", address);
        link.set_local_ip(address);

        stack.wait_config_down().await;
        info!("net: DHCP lease lost");
        link.set_local_ip(None);
    }
}
